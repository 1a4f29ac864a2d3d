//! Campaign Audit API — entry point.
//!
//! Serves the audit feed recorded by [`auditor::recorder`] from SQLite over
//! a small Axum REST API for frontend / admin consumption. This process does
//! not write: rows come from whichever process embeds the campaign registry
//! (see the `auditor-demo` binary).

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auditor::api::{self, ApiState};
use auditor::config::Config;
use auditor::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url, config.max_connections).await?;

    let app = api::router(Arc::new(ApiState { pool }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
