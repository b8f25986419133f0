//! Crate-wide error hierarchy for pr-context-engine.
//!
//! Diff text problems are never surfaced through these types to callers of
//! the parser or resolver; they degrade to empty/absent results instead.
//! Errors here cover provider I/O, configuration and programming contracts.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GitContextResult<T> = Result<T, GitContextError>;

/// Root error type for the pr-context-engine crate.
#[derive(Debug, Error)]
pub enum GitContextError {
    /// Provider (GitHub) related failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration problems (bad/missing tokens, base URL, env values).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors (bad repository ids, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Provider-specific error used inside the provider layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited {
        /// Optional `Retry-After` hint in seconds when available.
        retry_after_secs: Option<u64>,
    },

    /// Unprocessable entity (HTTP 422), e.g. a comment line outside the diff.
    #[error("unprocessable entity")]
    Unprocessable,

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (non-2xx) not covered by specific variants.
    #[error("http status error: status {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Hunk header errors. The parser logs and skips them; they never leave it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiffParseError {
    /// Hunk header could not be parsed.
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),

    /// A numeric field in a hunk header does not fit into `u32`.
    #[error("integer overflow in hunk header: {0}")]
    Overflow(String),
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// Environment variable is set but holds an unusable value.
    #[error("invalid value in {var}: {reason}")]
    InvalidValue {
        /// Variable name (e.g. `COMMENT_POST_DELAY_MS`).
        var: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// Invalid base API URL.
    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),
}

impl ProviderError {
    /// Maps a raw HTTP status code to the matching variant.
    pub fn from_status(code: u16) -> Self {
        match code {
            401 => ProviderError::Unauthorized,
            403 => ProviderError::Forbidden,
            404 => ProviderError::NotFound,
            422 => ProviderError::Unprocessable,
            429 => ProviderError::RateLimited {
                retry_after_secs: None,
            },
            500..=599 => ProviderError::Server(code),
            _ => ProviderError::HttpStatus(code),
        }
    }
}

// ===== Conversions for `?` ergonomics at the crate root =====

impl From<reqwest::Error> for GitContextError {
    fn from(e: reqwest::Error) -> Self {
        GitContextError::Provider(ProviderError::from(e))
    }
}

impl From<serde_json::Error> for GitContextError {
    fn from(e: serde_json::Error) -> Self {
        GitContextError::Provider(ProviderError::InvalidResponse(e.to_string()))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }

        if let Some(status) = e.status() {
            return ProviderError::from_status(status.as_u16());
        }

        if e.is_decode() {
            return ProviderError::InvalidResponse(e.to_string());
        }

        ProviderError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(
            ProviderError::from_status(401),
            ProviderError::Unauthorized
        ));
        assert!(matches!(
            ProviderError::from_status(422),
            ProviderError::Unprocessable
        ));
        assert!(matches!(
            ProviderError::from_status(429),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(503),
            ProviderError::Server(503)
        ));
        assert!(matches!(
            ProviderError::from_status(418),
            ProviderError::HttpStatus(418)
        ));
    }
}
