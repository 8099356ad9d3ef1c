//! Mock Market Data
//!
//! Deterministic synthetic histories for demos and tests. Assets move with
//! shared group factors (stablecoins, majors, memes, mid-caps) so clustering
//! has real structure to find, and the same seed always yields the same data.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use std::collections::HashSet;

use super::MarketDataClient;
use crate::error::{ClusterError, Result};
use crate::model::{PriceSeries, normalize_ticker};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Profile {
    Stable,
    Major,
    Meme,
    MidCap,
}

impl Profile {
    fn of(ticker: &str) -> Self {
        match ticker {
            "USDT" | "USDC" | "DAI" | "FDUSD" => Self::Stable,
            "BTC" | "ETH" | "BNB" | "SOL" => Self::Major,
            "DOGE" | "SHIB" | "PEPE" => Self::Meme,
            _ => Self::MidCap,
        }
    }
}

/// Static spot prices in USD
fn spot_price(ticker: &str) -> Option<Decimal> {
    let price = match ticker {
        "BTC" => dec!(97500),
        "ETH" => dec!(3450),
        "USDT" => dec!(1.00),
        "BNB" => dec!(690),
        "SOL" => dec!(195),
        "USDC" => dec!(1.00),
        "XRP" => dec!(2.35),
        "DOGE" => dec!(0.38),
        "TON" => dec!(5.60),
        "ADA" => dec!(0.95),
        "SHIB" => dec!(0.000022),
        "AVAX" => dec!(42.00),
        "TRX" => dec!(0.26),
        "DOT" => dec!(7.20),
        "BCH" => dec!(485),
        "LINK" => dec!(24.50),
        "NEAR" => dec!(5.40),
        "MATIC" => dec!(0.52),
        "LTC" => dec!(105),
        "ICP" => dec!(10.80),
        "LEO" => dec!(9.30),
        "DAI" => dec!(1.00),
        "UNI" => dec!(14.20),
        "APT" => dec!(9.10),
        "ETC" => dec!(27.40),
        "MANTLE" => dec!(1.15),
        "RNDR" => dec!(7.60),
        "HBAR" => dec!(0.28),
        "FIL" => dec!(5.20),
        "ATOM" => dec!(9.80),
        "ARB" => dec!(0.78),
        "IMX" => dec!(1.35),
        "STX" => dec!(1.70),
        "CRO" => dec!(0.15),
        "VET" => dec!(0.045),
        "MKR" => dec!(1650),
        "INJ" => dec!(24.00),
        "OP" => dec!(1.95),
        "GRT" => dec!(0.21),
        "KAS" => dec!(0.12),
        "XLM" => dec!(0.42),
        "XMR" => dec!(195),
        "PEPE" => dec!(0.000019),
        "FDUSD" => dec!(1.00),
        "SUI" => dec!(4.20),
        "OKB" => dec!(48.00),
        "LDO" => dec!(1.85),
        "QNT" => dec!(110),
        "THETA" => dec!(2.10),
        "SEI" => dec!(0.45),
        _ => return None,
    };
    Some(price)
}

/// Seeded synthetic market
pub struct MockMarketDataClient {
    seed: u64,
    end: NaiveDate,
    failing: HashSet<String>,
}

impl Default for MockMarketDataClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketDataClient {
    pub fn new() -> Self {
        Self {
            seed: 7,
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap_or_default(),
            failing: HashSet::new(),
        }
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Last date of every generated history
    pub const fn with_end_date(mut self, end: NaiveDate) -> Self {
        self.end = end;
        self
    }

    /// Tickers whose requests fail, for exercising soft failures
    pub fn with_failing<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.failing
            .extend(tickers.into_iter().map(|t| normalize_ticker(t.as_ref())));
        self
    }

    fn check(&self, ticker: &str) -> Result<Decimal> {
        if self.failing.contains(ticker) {
            return Err(ClusterError::MarketData(format!("simulated outage for {ticker}")));
        }
        spot_price(ticker).ok_or_else(|| ClusterError::MarketData(format!("no mock data for {ticker}")))
    }

    /// Shared factor path; identical for every ticker of a run
    fn factor(&self, stream: u64, days: usize, sigma: f64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_mul(1_000_003).wrapping_add(stream));
        (0..days).map(|_| gaussian(&mut rng) * sigma).collect()
    }

    fn returns(&self, ticker: &str, days: usize) -> Vec<f64> {
        let market = self.factor(1, days, 0.03);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ ticker_hash(ticker));

        let (group, beta, noise) = match Profile::of(ticker) {
            Profile::Stable => (vec![0.0; days], 0.0, 0.0005),
            Profile::Major => (vec![0.0; days], 1.0, 0.006),
            Profile::Meme => (self.factor(2, days, 0.08), 1.2, 0.02),
            Profile::MidCap => (self.factor(3, days, 0.04), 1.0, 0.015),
        };

        market
            .iter()
            .zip(&group)
            .map(|(m, g)| (beta * m + g + gaussian(&mut rng) * noise).max(-0.5))
            .collect()
    }
}

/// Standard normal draw (Box-Muller)
fn gaussian(rng: &mut ChaCha8Rng) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn ticker_hash(ticker: &str) -> u64 {
    ticker
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3))
}

#[async_trait]
impl MarketDataClient for MockMarketDataClient {
    async fn get_history(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        let ticker = normalize_ticker(ticker);
        let spot = self.check(&ticker)?;
        let days_len = days as usize;

        let start = self
            .end
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| ClusterError::MarketData(format!("{days} days reaches before the calendar")))?;

        let mut price = spot.to_f64().unwrap_or(1.0);
        let mut series = PriceSeries::new(&ticker, Vec::with_capacity(days_len + 1));
        let mut dates = start.iter_days();
        if let Some(first) = dates.next() {
            series.push(first, price);
        }
        for (date, r) in dates.zip(self.returns(&ticker, days_len)) {
            price *= 1.0 + r;
            series.push(date, price);
        }
        Ok(series)
    }

    async fn get_price(&self, ticker: &str) -> Result<Decimal> {
        self.check(&normalize_ticker(ticker))
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_UNIVERSE;

    fn returns(series: &PriceSeries) -> Vec<f64> {
        series
            .samples
            .windows(2)
            .map(|w| w[1].price / w[0].price - 1.0)
            .collect()
    }

    fn correlation(a: &[f64], b: &[f64]) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = a.len() as f64;
        let ma = a.iter().sum::<f64>() / n;
        let mb = b.iter().sum::<f64>() / n;
        let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
        let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
        let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
        cov / (va.sqrt() * vb.sqrt())
    }

    #[tokio::test]
    async fn test_history_shape() {
        let client = MockMarketDataClient::new();
        let btc = client.get_history("btc", 90).await.unwrap();

        assert_eq!(btc.ticker, "BTC");
        assert_eq!(btc.samples.len(), 91);
        assert_eq!(btc.samples.last().unwrap().date, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert!(btc.samples.iter().all(|s| s.price.is_finite() && s.price > 0.0));
    }

    #[tokio::test]
    async fn test_same_seed_same_history() {
        let a = MockMarketDataClient::new().with_seed(3).get_history("SOL", 30).await.unwrap();
        let b = MockMarketDataClient::new().with_seed(3).get_history("SOL", 30).await.unwrap();
        let c = MockMarketDataClient::new().with_seed(4).get_history("SOL", 30).await.unwrap();

        assert_eq!(a.samples, b.samples);
        assert_ne!(a.samples, c.samples);
    }

    #[tokio::test]
    async fn test_groups_move_together() {
        let client = MockMarketDataClient::new();
        let btc = returns(&client.get_history("BTC", 90).await.unwrap());
        let eth = returns(&client.get_history("ETH", 90).await.unwrap());
        let pepe = returns(&client.get_history("PEPE", 90).await.unwrap());
        let shib = returns(&client.get_history("SHIB", 90).await.unwrap());

        assert!(correlation(&btc, &eth) > 0.8);
        assert!(correlation(&pepe, &shib) > 0.8);
    }

    #[tokio::test]
    async fn test_covers_default_universe() {
        let client = MockMarketDataClient::new();
        let universe: Vec<String> = DEFAULT_UNIVERSE.iter().map(|t| (*t).to_string()).collect();

        assert_eq!(client.get_histories(&universe, 10).await.len(), universe.len());
        assert_eq!(client.get_prices(&universe).await.len(), universe.len());
    }

    #[tokio::test]
    async fn test_failures_are_soft_in_batches() {
        let client = MockMarketDataClient::new().with_failing(["eth"]);
        let tickers = vec!["BTC".to_string(), "ETH".to_string(), "ZZZ".to_string()];

        let histories = client.get_histories(&tickers, 10).await;
        assert_eq!(histories.len(), 1);
        assert_eq!(histories[0].ticker, "BTC");

        let prices = client.get_prices(&tickers).await;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("BTC"), Some(&dec!(97500)));

        assert!(matches!(client.get_price("ETH").await, Err(ClusterError::MarketData(_))));
    }
}
