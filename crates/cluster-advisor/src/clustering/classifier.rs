//! Cluster Classifier
//!
//! Names clusters after the anchor tickers they contain. Themes are derived
//! from an assignment on every call and never cached.

use crate::config::{EngineConfig, ThemeAnchors, TieBreak};
use crate::model::{ClusterAssignment, Theme};

/// Maps cluster ids to themes via anchor membership
#[derive(Clone, Debug)]
pub struct ClusterClassifier {
    anchors: ThemeAnchors,
    tie_break: TieBreak,
}

impl ClusterClassifier {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            anchors: config.anchors.clone().normalized(),
            tie_break: config.tie_break,
        }
    }

    /// Theme of one cluster, first matching rule wins:
    /// safe haven anchor, blue chip anchor, high volatility anchor, else altcoins
    pub fn classify(&self, cluster_id: usize, assignment: &ClusterAssignment) -> Theme {
        let has_anchor = |anchors: &[String]| {
            anchors
                .iter()
                .any(|a| assignment.cluster_of(a) == Some(cluster_id))
        };

        if has_anchor(&self.anchors.safe_haven) {
            Theme::SafeHaven
        } else if has_anchor(&self.anchors.blue_chips) {
            Theme::BlueChips
        } else if has_anchor(&self.anchors.high_volatility) {
            Theme::HighVolatility
        } else {
            Theme::Altcoins
        }
    }

    /// Theme per cluster id, index = cluster id
    pub fn themes(&self, assignment: &ClusterAssignment) -> Vec<Theme> {
        assignment
            .cluster_ids()
            .map(|c| self.classify(c, assignment))
            .collect()
    }

    /// The cluster standing for a theme, scanning ids in ascending order
    pub fn resolve(&self, theme: Theme, assignment: &ClusterAssignment) -> Option<usize> {
        self.pick(
            assignment
                .cluster_ids()
                .filter(|&c| self.classify(c, assignment) == theme),
        )
    }

    /// Apply the tie-break policy to ascending candidate ids
    pub fn pick(&self, mut candidates: impl Iterator<Item = usize>) -> Option<usize> {
        match self.tie_break {
            TieBreak::FirstMatch => candidates.next(),
            TieBreak::LastMatch => candidates.last(),
        }
    }

    pub const fn tie_break(&self) -> TieBreak {
        self.tie_break
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(pairs: &[(&str, usize)], k: usize) -> ClusterAssignment {
        ClusterAssignment::new(
            k,
            pairs.iter().map(|(t, _)| (*t).to_string()).collect(),
            pairs.iter().map(|(_, c)| *c).collect(),
        )
        .unwrap()
    }

    fn classifier() -> ClusterClassifier {
        ClusterClassifier::new(&EngineConfig::default())
    }

    #[test]
    fn test_anchor_precedence() {
        let a = assignment(
            &[
                ("USDC", 0),
                ("ETH", 0),
                ("SOL", 1),
                ("DOGE", 1),
                ("PEPE", 2),
                ("ADA", 3),
            ],
            4,
        );
        let c = classifier();

        // a stablecoin outranks a blue chip in the same cluster
        assert_eq!(c.classify(0, &a), Theme::SafeHaven);
        assert_eq!(c.classify(1, &a), Theme::BlueChips);
        assert_eq!(c.classify(2, &a), Theme::HighVolatility);
        assert_eq!(c.classify(3, &a), Theme::Altcoins);
    }

    #[test]
    fn test_empty_cluster_is_altcoins() {
        let a = assignment(&[("USDC", 0), ("ETH", 1)], 3);
        assert_eq!(classifier().classify(2, &a), Theme::Altcoins);
    }

    #[test]
    fn test_classification_is_pure() {
        let a = assignment(&[("USDT", 1), ("DOGE", 0), ("XRP", 2)], 3);
        let before = a.clone();
        let c = classifier();

        let first = c.themes(&a);
        let second = c.themes(&a);

        assert_eq!(first, second);
        assert_eq!(a, before);
        assert_eq!(first, vec![Theme::HighVolatility, Theme::SafeHaven, Theme::Altcoins]);
    }

    #[test]
    fn test_last_match_wins_by_default() {
        // USDC and USDT split across clusters 0 and 2: both are safe havens
        let a = assignment(&[("USDC", 0), ("ETH", 1), ("USDT", 2)], 3);
        let c = classifier();

        assert_eq!(c.tie_break(), TieBreak::LastMatch);
        assert_eq!(c.resolve(Theme::SafeHaven, &a), Some(2));
        assert_eq!(c.resolve(Theme::BlueChips, &a), Some(1));
    }

    #[test]
    fn test_first_match_policy() {
        let a = assignment(&[("USDC", 0), ("ETH", 1), ("USDT", 2)], 3);
        let c = ClusterClassifier::new(&EngineConfig::default().with_tie_break(TieBreak::FirstMatch));

        assert_eq!(c.resolve(Theme::SafeHaven, &a), Some(0));
    }

    #[test]
    fn test_missing_theme_resolves_to_none() {
        let a = assignment(&[("USDC", 0), ("ADA", 1)], 2);
        assert_eq!(classifier().resolve(Theme::BlueChips, &a), None);
    }

    #[test]
    fn test_custom_anchors() {
        let config = EngineConfig::default().with_anchors(ThemeAnchors {
            safe_haven: vec!["dai".into()],
            blue_chips: vec!["BTC".into()],
            high_volatility: vec!["SHIB".into()],
        });
        let a = assignment(&[("DAI", 0), ("BTC", 1), ("USDC", 2)], 3);
        let c = ClusterClassifier::new(&config);

        assert_eq!(c.classify(0, &a), Theme::SafeHaven);
        assert_eq!(c.classify(1, &a), Theme::BlueChips);
        assert_eq!(c.classify(2, &a), Theme::Altcoins);
    }
}
