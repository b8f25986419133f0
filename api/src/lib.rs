use std::sync::Arc;

pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

use crate::{
    core::app_state::AppState,
    error_handler::AppError,
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        github_webhook::github_webhook_route::github_webhook_route,
        health_route::health_route, trigger_pr::trigger_pr_route::trigger_pr_route,
    },
};

/// Loads state from the environment and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let state = Arc::new(AppState::from_env()?);
    let address = state.config.api_address.clone();

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(AppError::Bind)?;
    info!(%address, "pr review bot listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// All routes with the JSON error mapper applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhooks/github", post(github_webhook_route))
        .route("/trigger/github/pr", post(trigger_pr_route))
        .route("/health", get(health_route))
        .fallback(not_found)
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
