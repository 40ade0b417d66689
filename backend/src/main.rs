//! Main entry point for the HomeStock backend.
//!
//! This file initializes logging, loads configuration, opens the database,
//! bootstraps the default user, starts the revocation ledger cleanup and
//! serves the Axum application.

use homestock::{
    app,
    config::Config,
    database::Database,
    services::{
        blacklist_cleanup::spawn_cleanup_task,
        user_service::{DEFAULT_USERNAME, UserService},
    },
    state::AppState,
};
use anyhow::Context;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    let state = AppState::new(db.pool().clone(), config)?;

    if let Some(password) = UserService::new(&state.pool, &state.passwords)
        .ensure_default_user()
        .await?
    {
        warn!(
            username = DEFAULT_USERNAME,
            password = %password,
            "Created default user, change this password after the first login"
        );
    }

    if !state.login_limiter.is_enabled() {
        warn!("Login rate limiting is disabled");
    }

    let cleanup_every = Duration::from_secs(state.config.blacklist_cleanup_interval_minutes.max(1) * 60);
    spawn_cleanup_task(state.pool.clone(), cleanup_every);

    let bind_address = format!("0.0.0.0:{}", state.config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Starting HomeStock server on port {}", state.config.server_port);
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    db.close().await;
    Ok(())
}
