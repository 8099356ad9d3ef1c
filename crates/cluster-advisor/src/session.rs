//! Analysis Session
//!
//! Loads (or fetches) the feature matrix once, fits the clusters, and then
//! answers advice and portfolio queries from that immutable state. A session
//! is safe to share behind an `Arc`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::FeatureCache;
use crate::clustering::{ClusterClassifier, ClusterEngine, ClusterFit, FeatureMatrixBuilder};
use crate::config::{EngineConfig, SessionConfig};
use crate::error::Result;
use crate::market::MarketDataClient;
use crate::model::{ClusterAssignment, FeatureMatrix, Portfolio, Theme, normalize_ticker};
use crate::strategy::{AdviceReport, HedgeAdvisor, PortfolioAnalyzer, PortfolioReport};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the session's feature matrix came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Fresh cache hit
    Cache,
    /// Fetched from the market provider
    Live,
    /// Handed in directly
    Provided,
}

/// One asset in a snapshot
#[derive(Clone, Debug, Serialize)]
pub struct SnapshotPoint {
    pub ticker: String,
    pub cluster_id: usize,
    pub theme: Theme,
    pub held: bool,
    pub returns: Vec<f64>,
}

/// One cluster in a snapshot
#[derive(Clone, Debug, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub theme: Theme,
    pub members: Vec<String>,
}

/// Everything a plotting front end needs: the return matrix, the assignment,
/// per-cluster themes, and which assets the user holds
#[derive(Clone, Debug, Serialize)]
pub struct ClusterSnapshot {
    pub session_id: SessionId,
    pub dates: Vec<NaiveDate>,
    pub points: Vec<SnapshotPoint>,
    pub clusters: Vec<ClusterSummary>,

    /// Held tickers outside the analyzed universe
    pub unknown_held: Vec<String>,
}

/// Fitted clusters plus the advisors built on them
pub struct AnalysisSession {
    id: SessionId,
    created_at: DateTime<Utc>,
    source: DataSource,
    config: EngineConfig,
    matrix: FeatureMatrix,
    fit: ClusterFit,
    classifier: ClusterClassifier,
    advisor: HedgeAdvisor,
    analyzer: PortfolioAnalyzer,
}

impl AnalysisSession {
    /// Fresh cache hit, or fetch + build + store; then fit.
    ///
    /// Cache errors only cost a refetch. A failed cache write is logged.
    pub async fn bootstrap(
        market: &dyn MarketDataClient,
        cache: &dyn FeatureCache,
        config: &SessionConfig,
    ) -> Result<Self> {
        let ttl = Duration::seconds(config.cache_ttl_secs);

        let cached = match cache.read() {
            Ok(Some(entry)) if !FeatureMatrixBuilder::is_usable(&entry.matrix) => {
                warn!(
                    assets = entry.matrix.n_assets(),
                    dates = entry.matrix.n_dates(),
                    "cached features too small, refetching"
                );
                None
            }
            Ok(Some(entry)) if entry.is_fresh(Utc::now(), ttl) => Some(entry.matrix),
            Ok(Some(entry)) => {
                info!(written_at = %entry.written_at, "feature cache is stale, refetching");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "feature cache unreadable, refetching");
                None
            }
        };

        if let Some(matrix) = cached {
            info!(assets = matrix.n_assets(), dates = matrix.n_dates(), "using cached features");
            return Self::build(matrix, &config.engine, DataSource::Cache);
        }

        info!(
            provider = market.name(),
            assets = config.universe.len(),
            days = config.lookback_days,
            "fetching price histories"
        );
        let histories = market.get_histories(&config.universe, config.lookback_days).await;
        let matrix = FeatureMatrixBuilder::new().build(&histories)?;

        if let Err(e) = cache.write(&matrix) {
            warn!(error = %e, "failed to write feature cache");
        }

        Self::build(matrix, &config.engine, DataSource::Live)
    }

    /// Fit an already built matrix
    pub fn from_matrix(matrix: FeatureMatrix, config: &EngineConfig) -> Result<Self> {
        Self::build(matrix, config, DataSource::Provided)
    }

    fn build(matrix: FeatureMatrix, config: &EngineConfig, source: DataSource) -> Result<Self> {
        let fit = ClusterEngine::new(config).fit(&matrix)?;
        let session = Self {
            id: SessionId::new(),
            created_at: Utc::now(),
            source,
            config: config.clone(),
            matrix,
            fit,
            classifier: ClusterClassifier::new(config),
            advisor: HedgeAdvisor::new(config),
            analyzer: PortfolioAnalyzer::new(config),
        };

        info!(
            session = %session.id,
            ?source,
            assets = session.matrix.n_assets(),
            clusters = config.clusters,
            "analysis session ready"
        );
        Ok(session)
    }

    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn source(&self) -> DataSource {
        self.source
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub const fn fit(&self) -> &ClusterFit {
        &self.fit
    }

    pub const fn assignment(&self) -> &ClusterAssignment {
        &self.fit.assignment
    }

    /// Hedge guidance for one ticker
    pub fn advise_single_asset(&self, ticker: &str) -> Result<AdviceReport> {
        self.advisor.advise(ticker, &self.fit.assignment)
    }

    /// Value and diagnose holdings against the given spot prices
    pub fn analyze_portfolio(
        &self,
        portfolio: &Portfolio,
        prices: &HashMap<String, Decimal>,
    ) -> PortfolioReport {
        self.analyzer.analyze(portfolio, prices, &self.fit.assignment)
    }

    /// Visualization hand-off with `held` tickers flagged
    pub fn snapshot<S: AsRef<str>>(&self, held: &[S]) -> ClusterSnapshot {
        let assignment = &self.fit.assignment;
        let themes = self.classifier.themes(assignment);
        let held: Vec<String> = held.iter().map(|t| normalize_ticker(t.as_ref())).collect();

        let points = self
            .matrix
            .iter()
            .zip(assignment.labels())
            .map(|((ticker, returns), &cluster_id)| SnapshotPoint {
                ticker: ticker.to_string(),
                cluster_id,
                theme: themes[cluster_id],
                held: held.iter().any(|h| h == ticker),
                returns: returns.to_vec(),
            })
            .collect();

        let clusters = assignment
            .cluster_ids()
            .map(|cluster_id| ClusterSummary {
                cluster_id,
                theme: themes[cluster_id],
                members: assignment.members(cluster_id).into_iter().map(String::from).collect(),
            })
            .collect();

        let mut unknown_held: Vec<String> = held
            .into_iter()
            .filter(|t| !t.is_empty() && !assignment.contains(t))
            .collect();
        unknown_held.sort();
        unknown_held.dedup();

        ClusterSnapshot {
            session_id: self.id.clone(),
            dates: self.matrix.dates().to_vec(),
            points,
            clusters,
            unknown_held,
        }
    }
}
