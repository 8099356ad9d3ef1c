//! Crypto Cluster Advisor Server
//!
//! Bootstraps one analysis session (cached features or a fresh download),
//! then serves it over HTTP or, with `advisor-server repl`, a terminal loop.

mod handlers;
mod repl;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cluster_advisor::{
    AnalysisSession, CoinGeckoClient, FileFeatureCache, MarketDataClient, MockMarketDataClient,
    SessionConfig,
};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "serve".into());
    if !matches!(mode.as_str(), "serve" | "repl") {
        anyhow::bail!("unknown mode '{mode}', expected 'serve' or 'repl'");
    }

    let config = SessionConfig::from_env();

    // Market data provider
    let coingecko = CoinGeckoClient::from_env();
    let market: Arc<dyn MarketDataClient> = if coingecko.has_api_key() {
        tracing::info!("✓ CoinGecko API key configured");
        Arc::new(coingecko)
    } else {
        tracing::warn!("⚠ COIN_GECKO_API_KEY not set - using synthetic market data");
        Arc::new(MockMarketDataClient::new())
    };

    let cache = FileFeatureCache::new(&config.cache_path);
    let session = AnalysisSession::bootstrap(market.as_ref(), &cache, &config).await?;

    tracing::info!(
        session = %session.id(),
        source = ?session.source(),
        assets = session.assignment().len(),
        "Session ready"
    );
    for cluster in session.snapshot::<&str>(&[]).clusters {
        tracing::info!("  Cluster #{} {}: {} assets", cluster.cluster_id, cluster.theme, cluster.members.len());
    }

    let state = AppState::new(session, market);

    if mode == "repl" {
        return repl::run(state).await;
    }

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 cluster advisor running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  GET  /api/assets/{{ticker}}/advice  - Hedge advice for one coin");
    tracing::info!("  POST /api/portfolio               - Portfolio diagnosis");
    tracing::info!("  GET  /api/clusters?held=BTC,ETH   - Cluster snapshot");
    tracing::info!("");

    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
