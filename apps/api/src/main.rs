mod auth;
mod config;
mod db;
mod envelope;
mod errors;
mod interviews;
mod jobs;
mod models;
mod notifications;
mod org;
mod profit;
mod routes;
mod screening;
mod seed;
mod state;
mod uploads;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::routes::build_router;
use crate::seed::seed_defaults;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_PKG_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talentdesk API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL, schema and default records
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    seed_defaults(&db, &config).await?;

    if config.enable_direct_upload {
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        info!("Direct upload enabled, storing in {}", config.upload_dir.display());
    }
    if let Some(url) = &config.mail_relay_url {
        info!("Notification emails relayed to {url}");
    }

    let state = AppState::new(db, config.clone());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
