//! Hosting-provider access.
//!
//! Only GitHub is wired in. The client is a concrete type; the seams the
//! pipeline needs from it are the `ContentSource` trait and plain methods.

pub mod types;
pub use types::*;

pub mod github;

use std::time::Duration;

use tracing::debug;

use crate::errors::{ConfigError, GitContextResult};

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the provider client.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API base, e.g. "https://api.github.com" or a GHES "https://host/api/v3".
    pub base_api: String,
    /// Access token (PAT or app installation token).
    pub token: String,
    /// Upper bound for every GitHub request, connect to last body byte.
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_api", &self.base_api)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Reads `GITHUB_API_BASE` (optional), `GITHUB_TOKEN` (required) and
    /// `GITHUB_TIMEOUT_SECS` (optional, default 30).
    pub fn from_env() -> GitContextResult<Self> {
        let base_api = crate::config::env_or("GITHUB_API_BASE", DEFAULT_GITHUB_API);
        let token = crate::config::must_env("GITHUB_TOKEN")?;
        let timeout_secs = crate::config::env_opt_u64("GITHUB_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_GITHUB_TIMEOUT_SECS);
        Self::new(base_api, token)?.with_timeout_secs(timeout_secs)
    }

    /// Replaces the request timeout; zero is rejected.
    pub fn with_timeout_secs(mut self, secs: u64) -> GitContextResult<Self> {
        if secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "GITHUB_TIMEOUT_SECS",
                reason: "must be at least 1 second".into(),
            }
            .into());
        }
        self.timeout = Duration::from_secs(secs);
        Ok(self)
    }

    /// Validates and normalizes the base URL (no trailing slash).
    pub fn new(base_api: impl Into<String>, token: impl Into<String>) -> GitContextResult<Self> {
        let base_api = base_api.into().trim().trim_end_matches('/').to_string();
        if !(base_api.starts_with("http://") || base_api.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_api).into());
        }
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::MissingVar("GITHUB_TOKEN").into());
        }
        debug!(base_api = %base_api, "provider config ready");
        Ok(Self {
            base_api,
            token,
            timeout: Duration::from_secs(DEFAULT_GITHUB_TIMEOUT_SECS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized_and_checked() {
        let cfg = ProviderConfig::new("https://api.github.com/", "t0k").unwrap();
        assert_eq!(cfg.base_api, "https://api.github.com");
        assert!(!format!("{cfg:?}").contains("t0k"));

        assert!(ProviderConfig::new("api.github.com", "t").is_err());
        assert!(ProviderConfig::new(DEFAULT_GITHUB_API, "  ").is_err());
    }

    #[test]
    fn timeout_comes_from_env_with_default() {
        // Only this test touches the GITHUB_* variables.
        unsafe {
            std::env::set_var("GITHUB_TOKEN", "t0k");
            std::env::remove_var("GITHUB_API_BASE");
            std::env::remove_var("GITHUB_TIMEOUT_SECS");
        }
        let cfg = ProviderConfig::from_env().unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_GITHUB_TIMEOUT_SECS));

        unsafe { std::env::set_var("GITHUB_TIMEOUT_SECS", "7") };
        let cfg = ProviderConfig::from_env().unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(7));

        unsafe { std::env::set_var("GITHUB_TIMEOUT_SECS", "soon") };
        assert!(ProviderConfig::from_env().is_err());

        unsafe { std::env::set_var("GITHUB_TIMEOUT_SECS", "0") };
        assert!(ProviderConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("GITHUB_TIMEOUT_SECS");
            std::env::remove_var("GITHUB_TOKEN");
        }
    }
}
