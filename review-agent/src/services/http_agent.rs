//! HTTP review agent: POSTs the assembled PR analysis and reads back comments.
//!
//! Request body is the serialized `PrAnalysis`
//! (`{prInfo, summary, files: {added, modified, removed}, diffs: {unified, parsed}}`).
//! The response may be `{"comments": [...]}` (optionally with `success` and
//! `error`), a bare JSON array, or model text wrapping one. Each element is
//! normalized on its own; a bad element never sinks the batch.
//!
//! Errors never escape [`ReviewAgent::review`]: they become a failed
//! [`ReviewOutcome`].

use std::time::{Duration, Instant};

use pr_context_engine::git_providers::types::PrAnalysis;
use pr_context_engine::{ReviewAgent, ReviewComment, ReviewOutcome};
use reqwest::header;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::error_handler::{AgentError, Result, make_snippet};
use crate::normalize::{extract_comments, normalize_comment};

/// Thin client for an external review agent endpoint.
#[derive(Debug, Clone)]
pub struct HttpReviewAgent {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpReviewAgent {
    /// Builds an HTTP client with a timeout and JSON default headers.
    ///
    /// # Errors
    /// - [`AgentError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.timeout_secs);

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        info!(
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs,
            "HttpReviewAgent initialized"
        );

        Ok(Self {
            client,
            endpoint: cfg.endpoint,
            timeout,
        })
    }

    /// Sends the analysis and returns the normalized comments.
    ///
    /// # Errors
    /// - [`AgentError::Timeout`] when the agent does not answer in time
    /// - [`AgentError::HttpTransport`] for client/network failures
    /// - [`AgentError::HttpStatus`] for non-2xx responses
    /// - [`AgentError::Decode`] when no comment list can be found, or the
    ///   agent reports failure itself
    pub async fn request_comments(&self, analysis: &PrAnalysis) -> Result<Vec<ReviewComment>> {
        let started = Instant::now();
        debug!(
            pr = analysis.pr_info.number,
            files = analysis.summary.total_files,
            diff_bytes = analysis.unified_diff().len(),
            "POST {}", self.endpoint
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .json(analysis)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let snippet = make_snippet(&text);
            error!(
                %status,
                url = %self.endpoint,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "review agent returned non-success status"
            );
            return Err(AgentError::HttpStatus {
                status,
                url: self.endpoint.clone(),
                snippet,
            });
        }

        if let Some(reason) = reported_failure(&text) {
            return Err(AgentError::Decode(format!("agent reported failure: {reason}")));
        }

        let raw = extract_comments(&text).ok_or_else(|| {
            AgentError::Decode(format!(
                "no comment array in agent response: {}",
                make_snippet(&text)
            ))
        })?;

        let total = raw.len();
        let comments: Vec<ReviewComment> = raw
            .iter()
            .filter_map(|item| match normalize_comment(item) {
                Ok(c) => Some(c),
                Err(reason) => {
                    warn!(%reason, item = %make_snippet(&item.to_string()), "skipping agent comment");
                    None
                }
            })
            .collect();

        info!(
            pr = analysis.pr_info.number,
            received = total,
            accepted = comments.len(),
            latency_ms = started.elapsed().as_millis(),
            "review agent responded"
        );
        Ok(comments)
    }

    fn transport_error(&self, e: reqwest::Error) -> AgentError {
        if e.is_timeout() {
            AgentError::Timeout(self.timeout)
        } else {
            AgentError::HttpTransport(e)
        }
    }
}

impl ReviewAgent for HttpReviewAgent {
    async fn review(&self, analysis: &PrAnalysis) -> ReviewOutcome {
        match self.request_comments(analysis).await {
            Ok(comments) => ReviewOutcome::succeeded(comments),
            Err(err) => {
                warn!(error = %err, pr = analysis.pr_info.number, "review agent call failed");
                ReviewOutcome::failed(err.to_string())
            }
        }
    }
}

/// `{"success": false, "error": "..."}` from the agent itself.
fn reported_failure(text: &str) -> Option<String> {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) else {
        return None;
    };
    match map.get("success") {
        Some(Value::Bool(false)) => Some(
            map.get("error")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error")
                .to_string(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_side_failure_is_detected() {
        assert_eq!(
            reported_failure(r#"{"success": false, "error": "model overloaded", "comments": []}"#),
            Some("model overloaded".to_string())
        );
        assert_eq!(reported_failure(r#"{"success": true, "comments": []}"#), None);
        assert_eq!(reported_failure("[]"), None);
    }

    #[tokio::test]
    async fn unreachable_agent_yields_failed_outcome() {
        let agent = HttpReviewAgent::new(AgentConfig {
            endpoint: "http://127.0.0.1:9/review".into(),
            timeout_secs: 2,
        })
        .unwrap();

        let analysis = PrAnalysis {
            pr_info: pr_context_engine::git_providers::types::PrInfo {
                number: 1,
                title: "t".into(),
                repository: "o/r".into(),
                author: None,
                base_ref: "main".into(),
                head_ref: "f".into(),
                base_sha: "b".into(),
                head_sha: "h".into(),
                html_url: None,
            },
            summary: Default::default(),
            files: Default::default(),
            diffs: Default::default(),
        };

        let outcome = agent.review(&analysis).await;
        assert!(!outcome.success);
        assert!(outcome.comments.is_empty());
        assert!(outcome.error.is_some());
    }
}
