use pr_context_engine::{
    ReviewConfig, config::load_from_env, git_providers::github::GitHubClient,
};
use review_agent::{AgentConfig, HttpReviewAgent};
use tracing::{info, warn};

use crate::error_handler::{AppError, AppResult};

pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:3000";

/// Server-level settings.
#[derive(Clone)]
pub struct AppConfig {
    /// Listen address, e.g. "0.0.0.0:3000".
    pub api_address: String,
    /// Shared secret protecting the manual trigger; empty disables it.
    pub trigger_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_address = std::env::var("API_ADDRESS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_ADDRESS.into());
        let trigger_secret = std::env::var("TRIGGER_SECRET").unwrap_or_default();
        Self {
            api_address,
            trigger_secret,
        }
    }
}

/// Shared state for all HTTP handlers.
///
/// Built once at startup; every review run only borrows from it.
pub struct AppState {
    pub config: AppConfig,
    pub github: GitHubClient,
    pub agent: HttpReviewAgent,
    pub review: ReviewConfig,
}

impl AppState {
    /// Load shared state from environment variables.
    ///
    /// Fails fast on missing tokens/URLs and malformed numbers or enums.
    pub fn from_env() -> AppResult<Self> {
        let config = AppConfig::from_env();

        let (provider, review) =
            load_from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let github =
            GitHubClient::from_config(provider).map_err(|e| AppError::Config(e.to_string()))?;

        let agent_cfg = AgentConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let agent = HttpReviewAgent::new(agent_cfg).map_err(|e| AppError::Config(e.to_string()))?;

        if config.trigger_secret.trim().is_empty() {
            warn!("TRIGGER_SECRET is empty, manual trigger route is disabled");
        }
        info!(
            api_address = %config.api_address,
            fallback = ?review.publish.fallback,
            post_delay_ms = review.publish.post_delay.as_millis() as u64,
            dry_run = review.publish.dry_run,
            "application state loaded"
        );

        Ok(Self {
            config,
            github,
            agent,
            review,
        })
    }
}
