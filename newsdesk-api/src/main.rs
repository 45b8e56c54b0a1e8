//! Newsdesk API Server
//!
//! HTTP API serving aggregated, deduplicated and classified AI-industry news.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use newsdesk_core::{NewsdeskError, NewsdeskResult};
use newsdesk_services::{Aggregator, AggregatorConfig, TtlHarvestCache};
use newsdesk_sources::{HarvestConfig, Harvester, SourceRegistry};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

/// Router with every route and layer attached
pub fn app(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wire the registry, harvester and aggregator from the environment
fn build_state() -> NewsdeskResult<AppState> {
    let registry = SourceRegistry::from_env().map_err(NewsdeskError::from)?;
    info!("Loaded {} sources", registry.len());

    let harvest_config = HarvestConfig::from_env();
    let aggregator_config = AggregatorConfig::from_env();
    info!(
        "Harvest config: timeout {}s, revalidate {}s, media budget {}, media concurrency {}",
        harvest_config.fetch_timeout_secs,
        harvest_config.revalidate_secs,
        harvest_config.media_fallback_budget,
        harvest_config.media_fetch_concurrency
    );

    let mut aggregator = Aggregator::new(
        Arc::new(registry),
        Harvester::from_config(&harvest_config),
        &aggregator_config,
    );
    if aggregator_config.cache_enabled {
        aggregator = aggregator.with_cache(Arc::new(TtlHarvestCache::new()));
        info!("Harvest cache enabled");
    }

    Ok(AppState {
        aggregator: Arc::new(aggregator),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,newsdesk_api=debug")),
        )
        .init();

    info!("Starting Newsdesk API");

    // A broken source table is a deploy error, so refuse to start
    let state = build_state()?;

    // Start server
    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
