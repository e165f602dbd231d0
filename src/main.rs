mod api;
mod config;
mod engine;
mod error;
mod geo;
mod locks;
mod models;
mod observability;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let settings = state::FulfillmentSettings::new(
        config.delivery_estimate_minutes,
        config.busy_floor_minutes,
    );
    let shared_state = Arc::new(state::AppState::new(settings, config.event_buffer_size));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::listener::run_expiration_listener(
        shared_state.clone(),
    ));
    tokio::spawn(engine::reconciler::run_reconciler(
        shared_state.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
