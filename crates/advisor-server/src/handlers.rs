//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use cluster_advisor::{
    AdviceReport, ClusterError, ClusterSnapshot, DataSource, Holding, Portfolio, PortfolioReport,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub session_id: String,
    pub created_at: String,
    pub data_source: DataSource,
    pub provider: String,
    pub assets: usize,
    pub clusters: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct HoldingRequest {
    pub ticker: String,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PortfolioRequest {
    pub holdings: Vec<HoldingRequest>,

    /// Spot prices by ticker; anything missing is fetched
    #[serde(default)]
    pub prices: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ClustersQuery {
    /// Comma separated tickers to flag as held
    #[serde(default)]
    pub held: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &ClusterError) -> ApiError {
    let (status, code) = match err {
        ClusterError::AssetNotFound(_) => (StatusCode::NOT_FOUND, "ASSET_NOT_FOUND"),
        ClusterError::InvalidHolding(_) => (StatusCode::BAD_REQUEST, "INVALID_HOLDING"),
        ClusterError::MarketData(_) | ClusterError::Network(_) => {
            (StatusCode::BAD_GATEWAY, "MARKET_DATA_ERROR")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = &state.session;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        session_id: session.id().to_string(),
        created_at: session.created_at().to_rfc3339(),
        data_source: session.source(),
        provider: state.market.name().to_string(),
        assets: session.assignment().len(),
        clusters: session.assignment().k(),
    })
}

/// Hedge advice for one coin
pub async fn asset_advice(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<AdviceReport>, ApiError> {
    state
        .session
        .advise_single_asset(&ticker)
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// Value and diagnose a set of holdings
pub async fn analyze_portfolio(
    State(state): State<AppState>,
    Json(payload): Json<PortfolioRequest>,
) -> Result<Json<PortfolioReport>, ApiError> {
    let portfolio = Portfolio::from_holdings(
        payload
            .holdings
            .iter()
            .map(|h| Holding::new(&h.ticker, h.quantity)),
    )
    .map_err(|e| api_error(&e))?;

    let prices = state.resolve_prices(&portfolio, payload.prices).await;
    Ok(Json(state.session.analyze_portfolio(&portfolio, &prices)))
}

/// Cluster snapshot for plotting
pub async fn cluster_snapshot(
    State(state): State<AppState>,
    Query(query): Query<ClustersQuery>,
) -> Json<ClusterSnapshot> {
    let held: Vec<&str> = query
        .held
        .as_deref()
        .map(|s| s.split(',').filter(|t| !t.trim().is_empty()).collect())
        .unwrap_or_default();

    Json(state.session.snapshot(held.as_slice()))
}
