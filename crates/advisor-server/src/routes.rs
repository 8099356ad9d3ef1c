//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{analyze_portfolio, asset_advice, cluster_snapshot, health_check};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/assets/{ticker}/advice", get(asset_advice))
        .route("/api/portfolio", post(analyze_portfolio))
        .route("/api/clusters", get(cluster_snapshot))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
