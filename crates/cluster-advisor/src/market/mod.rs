//! Market Data
//!
//! Price history for clustering and spot prices for valuation. Every
//! provider sits behind [`MarketDataClient`] so the session never knows
//! whether it talks to CoinGecko or the deterministic mock.

mod coingecko;
mod mock;

pub use coingecko::CoinGeckoClient;
pub use mock::MockMarketDataClient;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

use crate::error::Result;
use crate::model::PriceSeries;

/// Market data provider
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Daily price history covering the last `days` days
    async fn get_history(&self, ticker: &str, days: u32) -> Result<PriceSeries>;

    /// Histories for many tickers; a failing ticker is logged and left out
    async fn get_histories(&self, tickers: &[String], days: u32) -> Vec<PriceSeries> {
        let mut histories = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            match self.get_history(ticker, days).await {
                Ok(series) => histories.push(series),
                Err(e) => warn!(%ticker, provider = self.name(), error = %e, "history fetch failed, dropping asset"),
            }
        }
        histories
    }

    /// Current USD price
    async fn get_price(&self, ticker: &str) -> Result<Decimal>;

    /// Spot prices keyed by ticker; misses are logged and left out
    async fn get_prices(&self, tickers: &[String]) -> HashMap<String, Decimal> {
        let mut prices = HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            match self.get_price(ticker).await {
                Ok(price) => {
                    prices.insert(ticker.clone(), price);
                }
                Err(e) => warn!(%ticker, provider = self.name(), error = %e, "price fetch failed"),
            }
        }
        prices
    }

    /// Provider name
    fn name(&self) -> &str;
}
