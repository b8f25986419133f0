//! Review agent settings loaded strictly from environment variables.
//!
//! # Environment variables
//! - `REVIEW_AGENT_URL`          = full URL the analysis is POSTed to (mandatory)
//! - `REVIEW_AGENT_TIMEOUT_SECS` = request timeout, default 120

use crate::error_handler::{Result, env_opt_u64, must_env, validate_http_endpoint};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Where and how long to talk to the review agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl AgentConfig {
    /// # Errors
    /// - missing `REVIEW_AGENT_URL`
    /// - non-http(s) endpoint
    /// - non-numeric timeout
    pub fn from_env() -> Result<Self> {
        let endpoint = must_env("REVIEW_AGENT_URL")?.trim().to_string();
        let timeout_secs = env_opt_u64("REVIEW_AGENT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(endpoint, timeout_secs)
    }

    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let endpoint = endpoint.into();
        validate_http_endpoint("REVIEW_AGENT_URL", &endpoint)?;
        Ok(Self {
            endpoint,
            timeout_secs,
        })
    }
}
