use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pr_context_engine::errors::{GitContextError, ProviderError};
use thiserror::Error;

use crate::core::http::response_envelope::ApiResponse;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    /// Rich HTTP error mapped from lower layers with specific status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR, // startup-only
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Http { status, .. } => *status,
            AppError::Bind(_) | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound => "NOT_FOUND",
            AppError::Http { code, .. } => *code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        ApiResponse::<()>::error(self.error_code(), self.to_string(), Vec::new())
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("invalid JSON payload: {err}"))
    }
}

/// Provider failures during a review run, mapped to gateway-style statuses.
impl From<GitContextError> for AppError {
    fn from(err: GitContextError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            GitContextError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            GitContextError::Provider(p) => match p {
                ProviderError::NotFound => (StatusCode::NOT_FOUND, "PR_NOT_FOUND"),
                ProviderError::Unauthorized | ProviderError::Forbidden => {
                    (StatusCode::BAD_GATEWAY, "PROVIDER_AUTH_FAILED")
                }
                ProviderError::RateLimited { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_RATE_LIMITED")
                }
                ProviderError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "PROVIDER_TIMEOUT"),
                _ => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            },
            GitContextError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        };
        AppError::Http {
            status,
            code,
            message,
        }
    }
}
