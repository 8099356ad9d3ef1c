//! Portfolio Analyzer
//!
//! Values holdings, rolls exposure up by cluster and theme, and runs an
//! ordered battery of heuristics to diagnose the portfolio's risk posture.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use super::hedge::examples;
use crate::clustering::ClusterClassifier;
use crate::config::EngineConfig;
use crate::model::{ClusterAssignment, Portfolio, Theme, normalize_ticker};

/// Summed portfolio percentage per theme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ThemeExposure {
    pub safe_haven: Decimal,
    pub blue_chips: Decimal,
    pub high_volatility: Decimal,
    pub altcoins: Decimal,
}

impl ThemeExposure {
    pub const fn get(&self, theme: Theme) -> Decimal {
        match theme {
            Theme::SafeHaven => self.safe_haven,
            Theme::BlueChips => self.blue_chips,
            Theme::HighVolatility => self.high_volatility,
            Theme::Altcoins => self.altcoins,
        }
    }

    fn add(&mut self, theme: Theme, pct: Decimal) {
        let slot = match theme {
            Theme::SafeHaven => &mut self.safe_haven,
            Theme::BlueChips => &mut self.blue_chips,
            Theme::HighVolatility => &mut self.high_volatility,
            Theme::Altcoins => &mut self.altcoins,
        };
        *slot += pct;
    }
}

/// Outcome of the diagnosis battery; exactly one per portfolio
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    Barbell,
    AltcoinHeavy,
    HighRisk,
    OverlyConservative,
    ConcentrationRisk,
    LiquidityDanger,
    Healthy,
}

impl Diagnosis {
    /// First matching rule wins
    pub fn evaluate(exposure: &ThemeExposure) -> Self {
        let safe = exposure.safe_haven;
        let blue = exposure.blue_chips;
        let vol = exposure.high_volatility;
        let alt = exposure.altcoins;

        if safe > dec!(30) && vol > dec!(30) && blue < dec!(10) {
            Self::Barbell
        } else if alt > dec!(40) {
            Self::AltcoinHeavy
        } else if vol > dec!(30) {
            Self::HighRisk
        } else if safe > dec!(50) {
            Self::OverlyConservative
        } else if blue > dec!(90) {
            Self::ConcentrationRisk
        } else if safe < dec!(5) {
            Self::LiquidityDanger
        } else {
            Self::Healthy
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Barbell => "Barbell Portfolio",
            Self::AltcoinHeavy => "Altcoin Heavy",
            Self::HighRisk => "High-Risk Exposure",
            Self::OverlyConservative => "Excessively Conservative",
            Self::ConcentrationRisk => "Concentration Risk",
            Self::LiquidityDanger => "Liquidity Danger",
            Self::Healthy => "Healthy Balance",
        }
    }

    pub const fn advice(self) -> &'static str {
        match self {
            Self::Barbell => {
                "You hold the extremes (stablecoins and speculative plays) with nothing in between. Add Blue Chips to anchor the portfolio."
            }
            Self::AltcoinHeavy => {
                "Mid-cap altcoins often bleed against the majors. Consolidate part of them into Blue Chips."
            }
            Self::HighRisk => {
                "Over 30% sits in high-volatility assets. Trim about 15% into Safe Haven assets."
            }
            Self::OverlyConservative => {
                "Over half the portfolio is parked in stablecoins. Deploy some of it into Blue Chips."
            }
            Self::ConcentrationRisk => {
                "Over 90% rides on Blue Chips. Keep a 5-10% Safe Haven buffer."
            }
            Self::LiquidityDanger => {
                "Under 5% in stablecoins leaves no dry powder. Build a 10-15% cash position."
            }
            Self::Healthy => "Your allocation is balanced. Maintain current weights.",
        }
    }

    /// Theme the advice points the holder towards
    pub const fn target_theme(self) -> Option<Theme> {
        match self {
            Self::Barbell | Self::AltcoinHeavy | Self::OverlyConservative => Some(Theme::BlueChips),
            Self::HighRisk | Self::ConcentrationRisk | Self::LiquidityDanger => Some(Theme::SafeHaven),
            Self::Healthy => None,
        }
    }
}

/// Valued holding row
#[derive(Clone, Debug, Serialize)]
pub struct HoldingValuation {
    pub ticker: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub value: Decimal,
    pub weight_pct: Decimal,
    pub cluster_id: usize,
    pub theme: Theme,
}

/// Value held in one cluster
#[derive(Clone, Debug, Serialize)]
pub struct ClusterExposure {
    pub cluster_id: usize,
    pub theme: Theme,
    pub value: Decimal,
    pub weight_pct: Decimal,
}

/// Diagnosis plus where to rotate
#[derive(Clone, Debug, Serialize)]
pub struct DiagnosisReport {
    pub diagnosis: Diagnosis,
    pub title: String,
    pub advice: String,
    pub target_cluster: Option<usize>,
    pub examples: Vec<String>,
}

/// Full portfolio analysis
#[derive(Clone, Debug, Serialize)]
pub struct PortfolioReport {
    pub total_value: Decimal,

    /// Sorted by value, largest first
    pub holdings: Vec<HoldingValuation>,

    /// Clusters holding value, ascending id
    pub clusters: Vec<ClusterExposure>,

    pub themes: ThemeExposure,

    /// Representative cluster per theme
    pub representatives: BTreeMap<Theme, usize>,

    /// `None` when nothing could be valued
    pub diagnosis: Option<DiagnosisReport>,
}

impl PortfolioReport {
    fn empty() -> Self {
        Self {
            total_value: Decimal::ZERO,
            holdings: Vec::new(),
            clusters: Vec::new(),
            themes: ThemeExposure::default(),
            representatives: BTreeMap::new(),
            diagnosis: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_value.is_zero()
    }
}

impl fmt::Display for PortfolioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Total portfolio value: $0.00 (no priced holdings in the analyzed universe)");
        }

        writeln!(f, "Portfolio Analysis")?;
        writeln!(f, "{}", "═".repeat(64))?;
        for h in &self.holdings {
            writeln!(
                f,
                "{:<7} ${:>14.2} {:>6.1}%  {} (#{})",
                h.ticker,
                h.value,
                h.weight_pct,
                h.theme.short_name(),
                h.cluster_id
            )?;
        }
        writeln!(f, "{}", "─".repeat(64))?;
        writeln!(f, "Total Value: ${:.2}", self.total_value)?;

        writeln!(f, "\nExposure by theme:")?;
        for theme in Theme::ALL {
            let pct = self.themes.get(theme);
            let bar_len = (pct / dec!(5)).to_usize().unwrap_or(0);
            writeln!(
                f,
                "  {:<16} {:>5.1}% {}",
                theme.short_name(),
                pct,
                "█".repeat(bar_len.min(20))
            )?;
        }

        if let Some(d) = &self.diagnosis {
            writeln!(f, "\nDiagnosis: {}", d.title)?;
            writeln!(f, "  {}", d.advice)?;
            if let Some(c) = d.target_cluster {
                writeln!(f, "  Look at Cluster #{c}: {}", d.examples.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Aggregates holdings by cluster/theme and diagnoses the mix
pub struct PortfolioAnalyzer {
    classifier: ClusterClassifier,
    max_examples: usize,
}

impl PortfolioAnalyzer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            classifier: ClusterClassifier::new(config),
            max_examples: config.max_examples,
        }
    }

    /// Analyze holdings against live prices.
    ///
    /// Holdings without a price or outside the assignment are left out of
    /// every total.
    pub fn analyze(
        &self,
        portfolio: &Portfolio,
        prices: &HashMap<String, Decimal>,
        assignment: &ClusterAssignment,
    ) -> PortfolioReport {
        let prices: HashMap<String, Decimal> = prices
            .iter()
            .map(|(t, p)| (normalize_ticker(t), *p))
            .collect();

        let mut valued = Vec::new();
        for (ticker, quantity) in portfolio.iter() {
            let Some(cluster_id) = assignment.cluster_of(ticker) else {
                debug!(%ticker, "holding not in cluster universe, skipped");
                continue;
            };
            let Some(&price) = prices.get(ticker).filter(|p| !p.is_sign_negative()) else {
                debug!(%ticker, "no price for holding, skipped");
                continue;
            };
            let Some(value) = price.checked_mul(quantity) else {
                debug!(%ticker, %quantity, "holding value overflows, skipped");
                continue;
            };
            valued.push((ticker, quantity, price, value, cluster_id));
        }

        let mut total_value = Decimal::ZERO;
        valued.retain(|v| match total_value.checked_add(v.3) {
            Some(sum) => {
                total_value = sum;
                true
            }
            None => {
                debug!(ticker = %v.0, "portfolio total overflows, holding skipped");
                false
            }
        });
        if total_value <= Decimal::ZERO {
            return PortfolioReport::empty();
        }

        let themes_by_cluster = self.classifier.themes(assignment);
        let pct = |value: Decimal| value / total_value * dec!(100);

        let mut holdings: Vec<HoldingValuation> = valued
            .iter()
            .map(|&(ticker, quantity, price, value, cluster_id)| HoldingValuation {
                ticker: ticker.to_string(),
                quantity,
                price,
                value,
                weight_pct: pct(value),
                cluster_id,
                theme: themes_by_cluster[cluster_id],
            })
            .collect();
        holdings.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.ticker.cmp(&b.ticker)));

        let mut by_cluster: BTreeMap<usize, Decimal> = BTreeMap::new();
        for h in &holdings {
            *by_cluster.entry(h.cluster_id).or_insert(Decimal::ZERO) += h.value;
        }

        let clusters: Vec<ClusterExposure> = by_cluster
            .into_iter()
            .map(|(cluster_id, value)| ClusterExposure {
                cluster_id,
                theme: themes_by_cluster[cluster_id],
                value,
                weight_pct: pct(value),
            })
            .collect();

        let mut themes = ThemeExposure::default();
        let mut candidates: BTreeMap<Theme, Vec<usize>> = BTreeMap::new();
        for c in &clusters {
            themes.add(c.theme, c.weight_pct);
            candidates.entry(c.theme).or_default().push(c.cluster_id);
        }

        let mut representatives = BTreeMap::new();
        for theme in Theme::ALL {
            let direct = candidates
                .get(&theme)
                .and_then(|ids| self.classifier.pick(ids.iter().copied()));
            // fall back to the whole assignment when no held cluster maps to the theme
            if let Some(id) = direct.or_else(|| self.classifier.resolve(theme, assignment)) {
                representatives.insert(theme, id);
            }
        }

        let diagnosis = Diagnosis::evaluate(&themes);
        let target_cluster = diagnosis
            .target_theme()
            .and_then(|t| representatives.get(&t).copied());

        debug!(
            total = %total_value,
            safe = %themes.safe_haven,
            blue = %themes.blue_chips,
            vol = %themes.high_volatility,
            alt = %themes.altcoins,
            ?diagnosis,
            "portfolio diagnosed"
        );

        PortfolioReport {
            total_value,
            holdings,
            clusters,
            themes,
            representatives,
            diagnosis: Some(DiagnosisReport {
                diagnosis,
                title: diagnosis.title().into(),
                advice: diagnosis.advice().into(),
                target_cluster,
                examples: target_cluster
                    .map(|c| examples(assignment, c, self.max_examples))
                    .unwrap_or_default(),
            }),
        }
    }
}
