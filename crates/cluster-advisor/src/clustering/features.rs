//! Feature Matrix Builder
//!
//! Aligns raw price series onto a shared calendar and converts them into
//! day-over-day percent returns.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::{ClusterError, Result};
use crate::model::{FeatureMatrix, PriceSeries, normalize_ticker};

/// Minimum aligned price dates and assets for a usable matrix
const MIN_ALIGNED_DATES: usize = 2;
const MIN_ASSETS: usize = 2;

/// Builds a dense return matrix from per-ticker price histories
#[derive(Clone, Debug, Default)]
pub struct FeatureMatrixBuilder;

impl FeatureMatrixBuilder {
    pub const fn new() -> Self {
        Self
    }

    /// Whether a prebuilt matrix meets the same minimums `build` enforces
    pub fn is_usable(matrix: &FeatureMatrix) -> bool {
        matrix.n_assets() >= MIN_ASSETS && matrix.n_dates() >= MIN_ALIGNED_DATES - 1
    }

    /// Collapse, align and transform the series.
    ///
    /// Duplicate dates keep the last observation. Only dates present for every
    /// remaining ticker survive. The first aligned date is consumed by the
    /// return calculation.
    pub fn build(&self, series: &[PriceSeries]) -> Result<FeatureMatrix> {
        let daily = Self::collapse(series);

        if daily.len() < MIN_ASSETS {
            return Err(ClusterError::DataInsufficient(format!(
                "{} asset(s) with usable prices, need at least {MIN_ASSETS}",
                daily.len()
            )));
        }

        let aligned = Self::common_dates(&daily);
        if aligned.len() < MIN_ALIGNED_DATES {
            return Err(ClusterError::DataInsufficient(format!(
                "{} date(s) shared by all assets, need at least {MIN_ALIGNED_DATES}",
                aligned.len()
            )));
        }

        let mut tickers = Vec::with_capacity(daily.len());
        let mut rows = Vec::with_capacity(daily.len());

        for (ticker, prices) in daily {
            let aligned_prices: Vec<f64> = aligned.iter().map(|d| prices[d]).collect();
            let returns = aligned_prices
                .windows(2)
                .map(|w| w[1] / w[0] - 1.0)
                .collect();

            tickers.push(ticker);
            rows.push(returns);
        }

        let dates = aligned[1..].to_vec();
        debug!(assets = tickers.len(), dates = dates.len(), "built feature matrix");

        FeatureMatrix::new(tickers, dates, rows)
    }

    /// Per-ticker `date -> price`, tickers in order of first appearance
    fn collapse(series: &[PriceSeries]) -> Vec<(String, BTreeMap<NaiveDate, f64>)> {
        let mut daily: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();

        for s in series {
            let ticker = normalize_ticker(&s.ticker);
            let idx = match daily.iter().position(|(t, _)| *t == ticker) {
                Some(idx) => idx,
                None => {
                    daily.push((ticker, BTreeMap::new()));
                    daily.len() - 1
                }
            };

            let prices = &mut daily[idx].1;
            for sample in &s.samples {
                if sample.price.is_finite() && sample.price > 0.0 {
                    // latest-in-day wins
                    prices.insert(sample.date, sample.price);
                }
            }
        }

        daily.retain(|(ticker, prices)| {
            if prices.is_empty() {
                warn!(%ticker, "no usable prices, dropping asset");
            }
            !prices.is_empty()
        });

        daily
    }

    /// Ascending dates present for every ticker
    fn common_dates(daily: &[(String, BTreeMap<NaiveDate, f64>)]) -> Vec<NaiveDate> {
        let Some((_, first)) = daily.first() else {
            return Vec::new();
        };

        let mut common: BTreeSet<NaiveDate> = first.keys().copied().collect();
        for (_, prices) in &daily[1..] {
            common.retain(|d| prices.contains_key(d));
        }

        common.into_iter().collect()
    }
}
