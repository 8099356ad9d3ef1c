//! Application State

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use cluster_advisor::{AnalysisSession, MarketDataClient, Portfolio, normalize_ticker};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Fitted clusters; read-only after bootstrap
    pub session: Arc<AnalysisSession>,

    /// Spot price source for portfolio valuation
    pub market: Arc<dyn MarketDataClient>,
}

impl AppState {
    pub fn new(session: AnalysisSession, market: Arc<dyn MarketDataClient>) -> Self {
        Self {
            session: Arc::new(session),
            market,
        }
    }

    /// Caller supplied prices, topped up from the market for any holding
    /// that has none
    pub async fn resolve_prices(
        &self,
        portfolio: &Portfolio,
        provided: HashMap<String, Decimal>,
    ) -> HashMap<String, Decimal> {
        let mut prices: HashMap<String, Decimal> = provided
            .into_iter()
            .map(|(ticker, price)| (normalize_ticker(&ticker), price))
            .collect();

        let missing: Vec<String> = portfolio
            .tickers()
            .into_iter()
            .filter(|t| !prices.contains_key(*t))
            .map(String::from)
            .collect();

        if !missing.is_empty() {
            tracing::debug!(count = missing.len(), provider = self.market.name(), "fetching spot prices");
            prices.extend(self.market.get_prices(&missing).await);
        }
        prices
    }
}
