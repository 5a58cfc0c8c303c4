//! iocscope - threat indicator lookup service
//!
//! Ingests raw indicator strings (IPs, domains, URLs, file hashes),
//! classifies and normalizes them, and resolves verdicts through a
//! rate-limited external threat-intel provider across a pool of API
//! credentials, caching results in PostgreSQL.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        IOCSCOPE                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌────────────┐   ┌───────────────────────┐  │
//! │  │  API     │──▶│ Classifier │──▶│  Lookup Orchestrator  │  │
//! │  │  (Axum)  │   └────────────┘   │  dedup / retry        │  │
//! │  └──────────┘                    └────┬─────────────┬────┘  │
//! │                                       ▼             ▼       │
//! │                                ┌───────────┐  ┌──────────┐  │
//! │                                │  KeyPool  │  │ Postgres │  │
//! │                                └─────┬─────┘  └──────────┘  │
//! │                                      ▼                      │
//! │                              external provider              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod intel;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intel::{KeyPool, LookupOrchestrator, LookupPolicy, PgRecordStore, VirusTotalProvider};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "iocscope=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("iocscope starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    // Build the lookup core
    let keys = Arc::new(KeyPool::new(config.vt_api_keys.clone(), config.rate_limits()));
    if keys.usable_len() == 0 {
        tracing::warn!("no provider credentials configured; every lookup will fail on quota");
    } else {
        tracing::info!("loaded {} provider credential(s)", keys.usable_len());
    }

    let mut provider = VirusTotalProvider::new(Duration::from_secs(config.request_timeout_seconds))
        .context("failed to build provider client")?;
    if let Some(base_url) = &config.vt_base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    let store = PgRecordStore::new(pool.clone());
    let orchestrator = Arc::new(LookupOrchestrator::new(
        Arc::new(store),
        Arc::new(provider),
        keys,
        LookupPolicy { cache_ttl_seconds: config.cache_ttl_seconds },
    ));

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
        orchestrator,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub orchestrator: Arc<LookupOrchestrator>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/scans", post(handlers::scans::create))
        .route("/api/v1/indicators", get(handlers::scans::list))
        .route("/api/v1/indicators/find", get(handlers::scans::find))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
