//! Hedge Advisor
//!
//! Theme-aware guidance for a single coin, pointing at the clusters that
//! offset its risk.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::clustering::ClusterClassifier;
use crate::config::EngineConfig;
use crate::error::{ClusterError, Result};
use crate::model::{ClusterAssignment, Theme, normalize_ticker};

/// What a recommendation asks the holder to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Add growth exposure
    AddGrowth,
    /// Offset risk with a defensive cluster
    Hedge,
    /// Move capital into another cluster
    Rotate,
}

/// A single suggestion, optionally tied to a target cluster
#[derive(Clone, Debug, Serialize)]
pub struct Recommendation {
    pub action: Action,
    pub message: String,
    pub target_theme: Option<Theme>,
    pub target_cluster: Option<usize>,
    pub examples: Vec<String>,
}

/// Advice for one ticker
#[derive(Clone, Debug, Serialize)]
pub struct AdviceReport {
    pub ticker: String,
    pub cluster_id: usize,
    pub theme: Theme,
    pub insight: String,
    pub recommendations: Vec<Recommendation>,
}

impl fmt::Display for AdviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- ANALYSIS FOR {} ---", self.ticker)?;
        writeln!(f, "Asset Class: {} (Cluster #{})", self.theme, self.cluster_id)?;
        writeln!(f, "Insight: {}", self.insight)?;

        for rec in &self.recommendations {
            writeln!(f, "Recommendation: {}", rec.message)?;
            if !rec.examples.is_empty() {
                writeln!(f, "  Examples: {}", rec.examples.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Produces hedge guidance from cluster membership
pub struct HedgeAdvisor {
    classifier: ClusterClassifier,
    max_examples: usize,
}

impl HedgeAdvisor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            classifier: ClusterClassifier::new(config),
            max_examples: config.max_examples,
        }
    }

    /// Advice bundle chosen by the ticker's own theme
    pub fn advise(&self, ticker: &str, assignment: &ClusterAssignment) -> Result<AdviceReport> {
        let ticker = normalize_ticker(ticker);
        let cluster_id = assignment
            .cluster_of(&ticker)
            .ok_or_else(|| ClusterError::AssetNotFound(ticker.clone()))?;

        let theme = self.classifier.classify(cluster_id, assignment);
        let safe = self.classifier.resolve(Theme::SafeHaven, assignment);
        let blue = self.classifier.resolve(Theme::BlueChips, assignment);

        debug!(%ticker, cluster_id, ?theme, ?safe, ?blue, "resolved hedge targets");

        let mut recommendations = Vec::new();
        let insight = match theme {
            Theme::SafeHaven => {
                if let Some(c) = blue {
                    recommendations.push(self.target(
                        Action::AddGrowth,
                        format!("For growth, consider adding 'Blue Chip' assets (Cluster #{c})."),
                        Theme::BlueChips,
                        c,
                        assignment,
                    ));
                }
                "You are playing it safe. This protects capital but limits gains."
            }
            Theme::HighVolatility => {
                if let Some(c) = safe {
                    recommendations.push(self.target(
                        Action::Hedge,
                        format!("Lock in profits by hedging with 'Safe Haven' assets (Cluster #{c})."),
                        Theme::SafeHaven,
                        c,
                        assignment,
                    ));
                }
                if let Some(c) = blue {
                    recommendations.push(self.target(
                        Action::Rotate,
                        format!("Rotate part of the position into 'Blue Chip' market leaders (Cluster #{c})."),
                        Theme::BlueChips,
                        c,
                        assignment,
                    ));
                }
                "This is a high-risk 'Degen' play. High upside, massive downside."
            }
            Theme::BlueChips => {
                if let Some(c) = safe {
                    recommendations.push(self.target(
                        Action::Hedge,
                        format!("To reduce volatility, hedge with Stablecoins (Cluster #{c})."),
                        Theme::SafeHaven,
                        c,
                        assignment,
                    ));
                }
                "You hold a Market Mover. It follows the general market trend."
            }
            Theme::Altcoins => {
                recommendations.push(Recommendation {
                    action: Action::Rotate,
                    message: "Consider rotating into market leaders (Blue Chips) or cash (Safe Haven)."
                        .into(),
                    target_theme: None,
                    target_cluster: None,
                    examples: Vec::new(),
                });
                "You hold a Mid-Cap Altcoin. These often bleed against ETH/BTC."
            }
        };

        Ok(AdviceReport {
            ticker,
            cluster_id,
            theme,
            insight: insight.into(),
            recommendations,
        })
    }

    fn target(
        &self,
        action: Action,
        message: String,
        theme: Theme,
        cluster_id: usize,
        assignment: &ClusterAssignment,
    ) -> Recommendation {
        Recommendation {
            action,
            message,
            target_theme: Some(theme),
            target_cluster: Some(cluster_id),
            examples: examples(assignment, cluster_id, self.max_examples),
        }
    }
}

/// First `limit` members of a cluster, in row order
pub(crate) fn examples(assignment: &ClusterAssignment, cluster_id: usize, limit: usize) -> Vec<String> {
    assignment
        .members(cluster_id)
        .into_iter()
        .take(limit)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> ClusterAssignment {
        let pairs = [
            ("USDC", 0),
            ("USDT", 0),
            ("ETH", 1),
            ("SOL", 1),
            ("BTC", 1),
            ("BNB", 1),
            ("AVAX", 1),
            ("DOT", 1),
            ("PEPE", 2),
            ("DOGE", 2),
            ("ADA", 3),
        ];
        ClusterAssignment::new(
            4,
            pairs.iter().map(|(t, _)| (*t).to_string()).collect(),
            pairs.iter().map(|(_, c)| *c).collect(),
        )
        .unwrap()
    }

    fn advisor() -> HedgeAdvisor {
        HedgeAdvisor::new(&EngineConfig::default())
    }

    #[test]
    fn test_stablecoin_gets_growth_nudge() {
        let report = advisor().advise("usdc", &universe()).unwrap();

        assert_eq!(report.ticker, "USDC");
        assert_eq!(report.theme, Theme::SafeHaven);
        assert_eq!(report.recommendations.len(), 1);

        let rec = &report.recommendations[0];
        assert_eq!(rec.action, Action::AddGrowth);
        assert_eq!(rec.target_cluster, Some(1));
        // capped at five examples
        assert_eq!(rec.examples, vec!["ETH", "SOL", "BTC", "BNB", "AVAX"]);
    }

    #[test]
    fn test_meme_gets_hedge_and_rotation() {
        let report = advisor().advise("PEPE", &universe()).unwrap();

        assert_eq!(report.theme, Theme::HighVolatility);
        let actions: Vec<_> = report.recommendations.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![Action::Hedge, Action::Rotate]);
        assert_eq!(report.recommendations[0].examples, vec!["USDC", "USDT"]);
        assert_eq!(report.recommendations[1].target_theme, Some(Theme::BlueChips));
    }

    #[test]
    fn test_blue_chip_hedges_with_stables() {
        let report = advisor().advise("SOL", &universe()).unwrap();

        assert_eq!(report.theme, Theme::BlueChips);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].action, Action::Hedge);
        assert_eq!(report.recommendations[0].target_cluster, Some(0));
    }

    #[test]
    fn test_altcoin_gets_generic_rotation() {
        let report = advisor().advise("ADA", &universe()).unwrap();

        assert_eq!(report.theme, Theme::Altcoins);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].target_cluster.is_none());
    }

    #[test]
    fn test_missing_targets_are_skipped() {
        // no safe haven and no blue chip cluster in this run
        let a = ClusterAssignment::new(2, vec!["DOGE".into(), "ADA".into()], vec![0, 1]).unwrap();
        let report = advisor().advise("DOGE", &a).unwrap();

        assert_eq!(report.theme, Theme::HighVolatility);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_safe_haven_without_blue_chips() {
        let a = ClusterAssignment::new(2, vec!["USDC".into(), "DOGE".into()], vec![0, 1]).unwrap();
        let report = advisor().advise("USDC", &a).unwrap();

        assert_eq!(report.theme, Theme::SafeHaven);
        assert!(report.recommendations.is_empty());
        assert!(report.insight.contains("playing it safe"));
    }

    #[test]
    fn test_blue_chip_without_safe_haven() {
        let a = ClusterAssignment::new(2, vec!["ETH".into(), "ADA".into()], vec![0, 1]).unwrap();
        let report = advisor().advise("ETH", &a).unwrap();

        assert_eq!(report.theme, Theme::BlueChips);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_meme_without_blue_chips_only_hedges() {
        let a = ClusterAssignment::new(2, vec!["USDT".into(), "PEPE".into()], vec![0, 1]).unwrap();
        let report = advisor().advise("PEPE", &a).unwrap();

        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].action, Action::Hedge);
        assert_eq!(report.recommendations[0].target_cluster, Some(0));
    }

    #[test]
    fn test_unknown_ticker() {
        let result = advisor().advise("ZZZ", &universe());
        assert!(matches!(result, Err(ClusterError::AssetNotFound(t)) if t == "ZZZ"));
    }

    #[test]
    fn test_report_rendering() {
        let text = advisor().advise("ETH", &universe()).unwrap().to_string();
        assert!(text.contains("ANALYSIS FOR ETH"));
        assert!(text.contains("Blue Chips (L1s & Majors) (Cluster #1)"));
        assert!(text.contains("Examples: USDC, USDT"));
    }
}
