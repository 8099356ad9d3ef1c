//! Domain Models
//!
//! Core data types for clustering a crypto universe and valuing holdings.
//! Feature data (historical prices, returns) is `f64`; anything that is money
//! (spot prices, quantities, values, weights) uses `rust_decimal`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{ClusterError, Result};

/// Normalize a user or provider supplied ticker ("  eth " -> "ETH")
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// A single (date, price) observation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub date: NaiveDate,
    pub price: f64,
}

impl PriceSample {
    pub const fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Raw price history for one ticker, in provider order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Ticker symbol (uppercase)
    pub ticker: String,

    /// Observations; may contain duplicate dates
    pub samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new(ticker: impl AsRef<str>, samples: Vec<PriceSample>) -> Self {
        Self {
            ticker: normalize_ticker(ticker.as_ref()),
            samples,
        }
    }

    pub fn push(&mut self, date: NaiveDate, price: f64) {
        self.samples.push(PriceSample::new(date, price));
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Dense asset x date matrix of daily returns.
///
/// Rows are assets (the clustering subjects), columns are dates (the feature
/// dimensions). Every row has exactly one value per date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureMatrix {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix, checking that it is rectangular and tickers are unique
    pub fn new(tickers: Vec<String>, dates: Vec<NaiveDate>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if tickers.len() != rows.len() {
            return Err(ClusterError::DataInsufficient(format!(
                "{} tickers but {} rows",
                tickers.len(),
                rows.len()
            )));
        }

        if let Some((ticker, row)) = tickers.iter().zip(&rows).find(|(_, r)| r.len() != dates.len()) {
            return Err(ClusterError::DataInsufficient(format!(
                "row {ticker} has {} values for {} dates",
                row.len(),
                dates.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = tickers.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ClusterError::DataInsufficient(format!("duplicate ticker {dup}")));
        }

        Ok(Self { tickers, dates, rows })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Feature vector for a ticker
    pub fn row(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.rows[i].as_slice())
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }

    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    /// Iterate `(ticker, returns)` in row order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.tickers
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter().map(Vec::as_slice))
    }
}

/// Semantic bucket a cluster belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    SafeHaven,
    BlueChips,
    HighVolatility,
    Altcoins,
}

impl Theme {
    pub const ALL: [Self; 4] = [
        Self::SafeHaven,
        Self::BlueChips,
        Self::HighVolatility,
        Self::Altcoins,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::SafeHaven => "Safe Haven (Stablecoins)",
            Self::BlueChips => "Blue Chips (L1s & Majors)",
            Self::HighVolatility => "High Volatility (Memes & Speculative)",
            Self::Altcoins => "Altcoins (Mid-Cap)",
        }
    }

    pub const fn short_name(self) -> &'static str {
        match self {
            Self::SafeHaven => "Safe Haven",
            Self::BlueChips => "Blue Chips",
            Self::HighVolatility => "High Volatility",
            Self::Altcoins => "Altcoins",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One cluster id per asset, in feature-matrix row order
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    k: usize,
    tickers: Vec<String>,
    labels: Vec<usize>,
}

impl ClusterAssignment {
    pub fn new(k: usize, tickers: Vec<String>, labels: Vec<usize>) -> Result<Self> {
        if tickers.len() != labels.len() {
            return Err(ClusterError::Configuration(format!(
                "{} tickers but {} labels",
                tickers.len(),
                labels.len()
            )));
        }

        if let Some(&bad) = labels.iter().find(|&&l| l >= k) {
            return Err(ClusterError::Configuration(format!(
                "cluster id {bad} outside 0..{k}"
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = tickers.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ClusterError::Configuration(format!("ticker {dup} assigned twice")));
        }

        Ok(Self { k, tickers, labels })
    }

    /// Configured number of clusters (some may be empty)
    pub const fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn cluster_ids(&self) -> std::ops::Range<usize> {
        0..self.k
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.cluster_of(ticker).is_some()
    }

    pub fn cluster_of(&self, ticker: &str) -> Option<usize> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.labels[i])
    }

    /// Members of a cluster, in row order
    pub fn members(&self, cluster_id: usize) -> Vec<&str> {
        self.iter()
            .filter(|&(_, c)| c == cluster_id)
            .map(|(t, _)| t)
            .collect()
    }

    /// Iterate `(ticker, cluster_id)` in row order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tickers
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().copied())
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Member count per cluster id
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// A user supplied (ticker, quantity) pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub quantity: Decimal,
}

impl Holding {
    pub fn new(ticker: impl AsRef<str>, quantity: Decimal) -> Self {
        Self {
            ticker: normalize_ticker(ticker.as_ref()),
            quantity,
        }
    }
}

/// Holdings keyed by ticker; repeated entries accumulate
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Portfolio {
    holdings: BTreeMap<String, Decimal>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of holdings, accumulating duplicates
    pub fn from_holdings<I>(holdings: I) -> Result<Self>
    where
        I: IntoIterator<Item = Holding>,
    {
        let mut portfolio = Self::new();
        for holding in holdings {
            portfolio.add_holding(&holding.ticker, holding.quantity)?;
        }
        Ok(portfolio)
    }

    /// Add quantity to a ticker
    pub fn add_holding(&mut self, ticker: &str, quantity: Decimal) -> Result<()> {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return Err(ClusterError::InvalidHolding("empty ticker".into()));
        }
        if quantity < Decimal::ZERO {
            return Err(ClusterError::InvalidHolding(format!(
                "{ticker} quantity {quantity} is negative"
            )));
        }

        *self.holdings.entry(ticker).or_insert(Decimal::ZERO) += quantity;
        Ok(())
    }

    pub fn quantity(&self, ticker: &str) -> Option<Decimal> {
        self.holdings.get(ticker).copied()
    }

    /// Iterate `(ticker, quantity)` in ticker order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.holdings.iter().map(|(t, q)| (t.as_str(), *q))
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.holdings.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_ticker_normalization() {
        assert_eq!(normalize_ticker("  eth "), "ETH");
        let series = PriceSeries::new("usdc", vec![]);
        assert_eq!(series.ticker, "USDC");
    }

    #[test]
    fn test_feature_matrix_rejects_ragged_rows() {
        let result = FeatureMatrix::new(
            vec!["BTC".into(), "ETH".into()],
            vec![day(2), day(3)],
            vec![vec![0.01, 0.02], vec![0.03]],
        );
        assert!(matches!(result, Err(ClusterError::DataInsufficient(_))));
    }

    #[test]
    fn test_feature_matrix_rejects_duplicate_tickers() {
        let result = FeatureMatrix::new(
            vec!["BTC".into(), "BTC".into()],
            vec![day(2)],
            vec![vec![0.01], vec![0.03]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_assignment_members_keep_row_order() {
        let assignment = ClusterAssignment::new(
            3,
            vec!["ETH".into(), "USDC".into(), "SOL".into()],
            vec![1, 0, 1],
        )
        .unwrap();

        assert_eq!(assignment.members(1), vec!["ETH", "SOL"]);
        assert_eq!(assignment.cluster_of("USDC"), Some(0));
        assert!(assignment.members(2).is_empty());
        assert_eq!(assignment.cluster_sizes(), vec![1, 2, 0]);
    }

    #[test]
    fn test_assignment_rejects_out_of_range_label() {
        let result = ClusterAssignment::new(2, vec!["ETH".into()], vec![2]);
        assert!(matches!(result, Err(ClusterError::Configuration(_))));
    }

    #[test]
    fn test_portfolio_accumulates_repeated_tickers() {
        let portfolio = Portfolio::from_holdings(vec![
            Holding::new("pepe", dec!(1000)),
            Holding::new("PEPE", dec!(250)),
            Holding::new("doge", dec!(500)),
        ])
        .unwrap();

        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.quantity("PEPE"), Some(dec!(1250)));
    }

    #[test]
    fn test_portfolio_rejects_negative_quantity() {
        let mut portfolio = Portfolio::new();
        let result = portfolio.add_holding("BTC", dec!(-1));
        assert!(matches!(result, Err(ClusterError::InvalidHolding(_))));
        assert!(portfolio.add_holding("BTC", Decimal::ZERO).is_ok());
    }
}
