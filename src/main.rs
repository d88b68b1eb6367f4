//! QuocBank API server.
//!
//! Customers register, hold VND accounts and move money through transfers,
//! deposits, withdrawals, bill payments, term savings, piggy banks, mobile
//! recharges and cashback redemption. Cards and account controls round it out.
//!
//! Every balance change goes through `services::ledger::apply`, which locks the
//! affected accounts, rewrites their balances and appends one ledger entry inside
//! the caller's database transaction.
//!
//! Startup: load config, connect, migrate, serve.

mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config).await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "Database pool created"
    );

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = routes::router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
