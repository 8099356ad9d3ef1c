//! CoinGecko Client
//!
//! Daily history from `coins/{id}/market_chart` and spot prices from
//! `simple/price`. The public demo tier rate limits hard, so history requests
//! are spaced out by a fixed pause.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::MarketDataClient;
use crate::error::{ClusterError, Result};
use crate::model::{PriceSeries, normalize_ticker};

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Ticker -> CoinGecko coin id for the default universe
const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("USDT", "tether"),
    ("BNB", "binancecoin"),
    ("SOL", "solana"),
    ("USDC", "usd-coin"),
    ("XRP", "ripple"),
    ("DOGE", "dogecoin"),
    ("TON", "the-open-network"),
    ("ADA", "cardano"),
    ("SHIB", "shiba-inu"),
    ("AVAX", "avalanche-2"),
    ("TRX", "tron"),
    ("DOT", "polkadot"),
    ("BCH", "bitcoin-cash"),
    ("LINK", "chainlink"),
    ("NEAR", "near"),
    ("MATIC", "matic-network"),
    ("LTC", "litecoin"),
    ("ICP", "internet-computer"),
    ("LEO", "leo-token"),
    ("DAI", "dai"),
    ("UNI", "uniswap"),
    ("APT", "aptos"),
    ("ETC", "ethereum-classic"),
    ("MANTLE", "mantle"),
    ("RNDR", "render-token"),
    ("HBAR", "hedera-hashgraph"),
    ("FIL", "filecoin"),
    ("ATOM", "cosmos"),
    ("ARB", "arbitrum"),
    ("IMX", "immutable-x"),
    ("STX", "blockstack"),
    ("CRO", "crypto-com-chain"),
    ("VET", "vechain"),
    ("MKR", "maker"),
    ("INJ", "injective-protocol"),
    ("OP", "optimism"),
    ("GRT", "the-graph"),
    ("KAS", "kaspa"),
    ("XLM", "stellar"),
    ("XMR", "monero"),
    ("PEPE", "pepe"),
    ("FDUSD", "first-digital-usd"),
    ("SUI", "sui"),
    ("OKB", "okb"),
    ("LDO", "lido-dao"),
    ("QNT", "quant-network"),
    ("THETA", "theta-token"),
    ("SEI", "sei-network"),
];

/// CoinGecko id for a ticker
pub fn coin_id(ticker: &str) -> Option<&'static str> {
    let ticker = normalize_ticker(ticker);
    COIN_IDS
        .iter()
        .find(|(t, _)| *t == ticker)
        .map(|(_, id)| *id)
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    /// `[unix_ms, price]` pairs
    prices: Vec<(f64, f64)>,
}

/// `{ "bitcoin": { "usd": 97000.0 } }`
type SimplePrice = HashMap<String, HashMap<String, f64>>;

/// CoinGecko REST client
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_pause: Duration,
}

impl CoinGeckoClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            request_pause: Duration::from_secs(2),
        }
    }

    /// Client configured from `COIN_GECKO_API_KEY`
    pub fn from_env() -> Self {
        Self::new(std::env::var("COIN_GECKO_API_KEY").ok())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub const fn with_request_pause(mut self, pause: Duration) -> Self {
        self.request_pause = pause;
        self
    }

    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn resolve(ticker: &str) -> Result<&'static str> {
        coin_id(ticker).ok_or_else(|| {
            ClusterError::MarketData(format!("no CoinGecko id known for {}", normalize_ticker(ticker)))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClusterError::MarketData(format!("CoinGecko returned {status} for {url}")));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketDataClient for CoinGeckoClient {
    async fn get_history(&self, ticker: &str, days: u32) -> Result<PriceSeries> {
        let id = Self::resolve(ticker)?;
        let url = format!("{}/coins/{id}/market_chart", self.base_url);
        let chart: MarketChart = self
            .get_json(&url, &[("vs_currency", "usd".into()), ("days", days.to_string())])
            .await?;

        let mut series = PriceSeries::new(ticker, Vec::with_capacity(chart.prices.len()));
        for (ms, price) in chart.prices {
            #[allow(clippy::cast_possible_truncation)]
            let Some(at) = DateTime::from_timestamp_millis(ms as i64) else {
                continue;
            };
            series.push(at.date_naive(), price);
        }

        debug!(ticker = %series.ticker, samples = series.samples.len(), "fetched history");
        Ok(series)
    }

    async fn get_histories(&self, tickers: &[String], days: u32) -> Vec<PriceSeries> {
        info!(assets = tickers.len(), days, "fetching histories from CoinGecko");

        let mut histories = Vec::with_capacity(tickers.len());
        for (i, ticker) in tickers.iter().enumerate() {
            if i > 0 && !self.request_pause.is_zero() {
                tokio::time::sleep(self.request_pause).await;
            }
            match self.get_history(ticker, days).await {
                Ok(series) => histories.push(series),
                Err(e) => warn!(%ticker, error = %e, "history fetch failed, dropping asset"),
            }
        }
        histories
    }

    async fn get_price(&self, ticker: &str) -> Result<Decimal> {
        let ticker = normalize_ticker(ticker);
        self.get_prices(std::slice::from_ref(&ticker))
            .await
            .remove(&ticker)
            .ok_or_else(|| ClusterError::MarketData(format!("no spot price for {ticker}")))
    }

    /// One batched `simple/price` call for every known ticker
    async fn get_prices(&self, tickers: &[String]) -> HashMap<String, Decimal> {
        let ids: HashMap<&'static str, String> = tickers
            .iter()
            .filter_map(|t| match coin_id(t) {
                Some(id) => Some((id, normalize_ticker(t))),
                None => {
                    warn!(ticker = %t, "no CoinGecko id, price skipped");
                    None
                }
            })
            .collect();
        if ids.is_empty() {
            return HashMap::new();
        }

        let mut joined: Vec<&str> = ids.keys().copied().collect();
        joined.sort_unstable();

        let url = format!("{}/simple/price", self.base_url);
        let quotes: SimplePrice = match self
            .get_json(&url, &[("ids", joined.join(",")), ("vs_currencies", "usd".into())])
            .await
        {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "spot price fetch failed");
                return HashMap::new();
            }
        };

        quotes
            .into_iter()
            .filter_map(|(id, quote)| {
                let ticker = ids.get(id.as_str())?;
                let usd = quote.get("usd").copied().and_then(Decimal::from_f64)?;
                Some((ticker.clone(), usd))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "CoinGecko"
    }
}
