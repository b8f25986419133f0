//! Errors raised while configuring or calling the external review agent.
//!
//! Messages carry a `[Review Agent]` prefix so they stand out in the
//! pipeline logs next to GitHub provider failures.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Why a review request produced no comments.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration/validation errors (startup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Connection, TLS or body read failure.
    #[error("[Review Agent] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// The agent answered with a non-successful HTTP status.
    #[error("[Review Agent] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        /// Short, trimmed snippet of the response body.
        snippet: String,
    },

    /// The response did not contain a usable comment list.
    #[error("[Review Agent] decode error: {0}")]
    Decode(String),

    /// The agent did not answer within `REVIEW_AGENT_TIMEOUT_SECS`.
    #[error("[Review Agent] operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Bad or missing agent settings, reported at startup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("[Review Agent] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (timeouts).
    #[error("[Review Agent] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// `REVIEW_AGENT_URL` is not an HTTP(S) URL.
    #[error("[Review Agent] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Agent settings from the environment                                       */
/* ------------------------------------------------------------------------- */

fn non_blank(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads a setting the agent client cannot start without.
pub fn must_env(name: &'static str) -> Result<String> {
    non_blank(name).ok_or_else(|| ConfigError::MissingVar(name).into())
}

/// Reads an optional whole number such as a timeout in seconds.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    non_blank(name)
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                AgentError::from(ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected u64",
                })
            })
        })
        .transpose()
}

/// Rejects agent URLs without an `http://` or `https://` scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    let scheme_ok = ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme));
    if scheme_ok {
        return Ok(());
    }
    Err(ConfigError::InvalidFormat {
        var,
        reason: "must start with http:// or https://",
    }
    .into())
}

/// Shortens a response body for logs and error messages.
pub fn make_snippet(text: &str) -> String {
    const MAX: usize = 300;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_scheme_is_checked() {
        assert!(validate_http_endpoint("X", "https://agent.local/review").is_ok());
        assert!(validate_http_endpoint("X", "agent.local").is_err());
    }

    #[test]
    fn snippets_are_bounded() {
        assert_eq!(make_snippet("  short  "), "short");
        let long = "x".repeat(1000);
        assert_eq!(make_snippet(&long).chars().count(), 301);
    }
}
