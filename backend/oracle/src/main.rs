//! Pledgecamp oracle: entry point.
//!
//! Accepts workflow actions for projects and CampShares, hands the matching
//! transactions to the Relayer, interprets the Relayer's callbacks and
//! reports outcomes to the Backend. A scheduler runs milestone checks,
//! dormant-fund recovery and a stalled-activity sweep in the background.

mod api;
mod backend;
mod callback;
mod commitment;
mod config;
mod db;
mod dispatch;
mod errors;
mod events;
mod ledger;
mod locks;
mod models;
mod oracle;
mod queries;
mod relayer;
mod saga;
mod scheduler;
#[cfg(test)]
mod testutil;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use backend::HttpBackend;
use config::Config;
use oracle::Oracle;
use relayer::HttpRelayer;
use scheduler::LogStalledHook;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Arc::new(Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?);

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // One HTTP client for both the Relayer and the Backend.
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    let oracle = Arc::new(Oracle::new(
        pool,
        Arc::new(HttpRelayer::new(
            client.clone(),
            &config.relayer_url,
            &config.relayer_auth_token,
        )),
        Arc::new(HttpBackend::new(
            client,
            &config.backend_url,
            &config.backend_auth_token,
        )),
        config.clone(),
    ));

    // ─── Scheduler ────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let tasks = scheduler::run(oracle.clone(), Arc::new(LogStalledHook), shutdown.clone());

    // ─── REST API ─────────────────────────────────────────
    let app = api::router(oracle)?;
    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutting down");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            error!("Scheduler task ended abnormally: {e}");
        }
    }
    Ok(())
}
