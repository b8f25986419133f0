//! Environment-driven configuration for the review pipeline.
//!
//! # Environment variables
//! - `GITHUB_API_BASE`       = API base (default `https://api.github.com`)
//! - `GITHUB_TOKEN`          = access token (mandatory)
//! - `GITHUB_TIMEOUT_SECS`   = per-request timeout (default 30)
//! - `COMMENT_FALLBACK`      = `drop` | `file` | `diff` (default `drop`)
//! - `COMMENT_POST_DELAY_MS` = pause between posted comments (default 100)
//! - `PUBLISH_DRY_RUN`       = `true` to log comments instead of posting

use std::time::Duration;

use crate::errors::{ConfigError, GitContextResult};
use crate::git_providers::ProviderConfig;
use crate::publish::{FallbackPolicy, PublishConfig};

/// Everything `run_review` needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct ReviewConfig {
    pub publish: PublishConfig,
}

impl ReviewConfig {
    pub fn from_env() -> GitContextResult<Self> {
        let defaults = PublishConfig::default();

        let fallback = match env_opt("COMMENT_FALLBACK") {
            Some(v) => v.parse::<FallbackPolicy>()?,
            None => defaults.fallback,
        };
        let post_delay = env_opt_u64("COMMENT_POST_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.post_delay);
        let dry_run = env_opt_bool("PUBLISH_DRY_RUN")?.unwrap_or(defaults.dry_run);

        Ok(Self {
            publish: PublishConfig {
                dry_run,
                post_delay,
                fallback,
            },
        })
    }
}

/// Loads provider and pipeline configuration together.
pub fn load_from_env() -> GitContextResult<(ProviderConfig, ReviewConfig)> {
    Ok((ProviderConfig::from_env()?, ReviewConfig::from_env()?))
}

/* ------------------------------------------------------------------------- */
/* Env helpers                                                               */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> GitContextResult<String> {
    env_opt(name).ok_or_else(|| ConfigError::MissingVar(name).into())
}

/// Value of `name` if set and non-blank.
pub fn env_opt(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

/// Parses an optional `u64` (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> GitContextResult<Option<u64>> {
    env_opt(name)
        .map(|v| {
            v.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue {
                    var: name,
                    reason: format!("expected u64, got '{v}'"),
                }
                .into()
            })
        })
        .transpose()
}

/// Parses an optional boolean flag (`true/false/1/0/yes/no`).
pub fn env_opt_bool(name: &'static str) -> GitContextResult<Option<bool>> {
    env_opt(name).map(|v| parse_flag(name, &v)).transpose()
}

fn parse_flag(name: &'static str, raw: &str) -> GitContextResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: name,
            reason: format!("expected a boolean, got '{other}'"),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(parse_flag("X", " 1 ").unwrap());
        assert!(!parse_flag("X", "off").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }
}
