use std::sync::Arc;

use kingx_delivery::api;
use kingx_delivery::config::Config;
use kingx_delivery::engine::notifications::run_notification_engine;
use kingx_delivery::engine::seed::seed_demo_data;
use kingx_delivery::error::AppError;
use kingx_delivery::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (app_state, event_rx) =
        AppState::new(config.event_queue_size, config.event_buffer_size, &config.ai)?;
    let shared_state = Arc::new(app_state);

    if !shared_state.ai.is_enabled() {
        tracing::warn!("AI_API_KEY not set; route optimization and estimates use fallbacks");
    }

    if config.seed_demo_data {
        seed_demo_data(&shared_state)?;
    }

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(run_notification_engine(shared_state.clone(), event_rx));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
