//! # cluster-advisor
//!
//! Groups a universe of crypto assets by how their daily returns move, names
//! each group after the anchor coins it contains, and turns that grouping into
//! hedge advice for a single coin or a whole portfolio.
//!
//! ## Pipeline
//!
//! ```text
//! price histories ──► FeatureMatrixBuilder ──► ClusterEngine ──► ClusterClassifier
//!   (MarketDataClient,     aligned daily           seeded k-means      anchor themes
//!    FeatureCache)         returns                                           │
//!                                                          ┌─────────────────┴──────┐
//!                                                     HedgeAdvisor         PortfolioAnalyzer
//!                                                     (one coin)           (holdings + prices)
//! ```
//!
//! ## Themes
//!
//! | Theme            | Anchor tickers | Typical advice                    |
//! |------------------|----------------|-----------------------------------|
//! | Safe Haven       | USDC, USDT     | add Blue Chips for growth         |
//! | Blue Chips       | ETH, SOL       | hedge with stablecoins            |
//! | High Volatility  | PEPE, DOGE     | hedge, then rotate to Blue Chips  |
//! | Altcoins         | anything else  | rotate into leaders or cash       |
//!
//! Features are `f64`; money (spot prices, quantities, values, weights) is
//! `rust_decimal::Decimal`.

pub mod cache;
pub mod clustering;
pub mod config;
pub mod error;
pub mod market;
pub mod model;
pub mod session;
pub mod strategy;

pub use cache::{CachedMatrix, FeatureCache, FileFeatureCache, MemoryFeatureCache};
pub use clustering::{ClusterClassifier, ClusterEngine, ClusterFit, FeatureMatrixBuilder};
pub use config::{DEFAULT_UNIVERSE, EngineConfig, SessionConfig, ThemeAnchors, TieBreak};
pub use error::{ClusterError, Result};
pub use market::{CoinGeckoClient, MarketDataClient, MockMarketDataClient};
pub use model::{
    ClusterAssignment, FeatureMatrix, Holding, Portfolio, PriceSample, PriceSeries, Theme,
    normalize_ticker,
};
pub use session::{AnalysisSession, ClusterSnapshot, DataSource, SessionId};
pub use strategy::{AdviceReport, Diagnosis, HedgeAdvisor, PortfolioAnalyzer, PortfolioReport};
