//! GitHub webhook payloads (subset) and the review/ignore decision.

use pr_context_engine::git_providers::ChangeRequestId;
use serde::{Deserialize, Serialize};

/// `pull_request` event body.
#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestRef,
    pub repository: RepositoryRef,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    pub head: HeadRef,
}

#[derive(Debug, Deserialize)]
pub struct HeadRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

/// What the webhook route does with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDecision {
    Review { id: ChangeRequestId, head_sha: String },
    Ignore(String),
}

/// Response body for accepted or ignored deliveries.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Actions that change the PR's code and therefore get a fresh review.
pub fn should_review(action: &str) -> bool {
    matches!(action, "opened" | "synchronize" | "reopened")
}

/// Decides from the `X-GitHub-Event` name and raw body.
///
/// Only `pull_request` bodies are parsed; every other event is ignored
/// without looking at the payload.
pub fn decide(event: &str, body: &[u8]) -> Result<WebhookDecision, serde_json::Error> {
    if event != "pull_request" {
        return Ok(WebhookDecision::Ignore(format!("event '{event}' not handled")));
    }

    let ev: PullRequestEvent = serde_json::from_slice(body)?;
    if !should_review(&ev.action) {
        return Ok(WebhookDecision::Ignore(format!(
            "pull_request action '{}' not handled",
            ev.action
        )));
    }

    Ok(WebhookDecision::Review {
        id: ChangeRequestId {
            project: ev.repository.full_name,
            iid: ev.number,
        },
        head_sha: ev.pull_request.head.sha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr_body(action: &str) -> Vec<u8> {
        serde_json::json!({
            "action": action,
            "number": 17,
            "pull_request": {"number": 17, "draft": false, "head": {"sha": "abc123", "ref": "feat"}},
            "repository": {"full_name": "octo/repo", "id": 1},
            "sender": {"login": "octocat"}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn code_changing_actions_trigger_review() {
        for action in ["opened", "synchronize", "reopened"] {
            assert_eq!(
                decide("pull_request", &pr_body(action)).unwrap(),
                WebhookDecision::Review {
                    id: ChangeRequestId {
                        project: "octo/repo".into(),
                        iid: 17
                    },
                    head_sha: "abc123".into()
                }
            );
        }
    }

    #[test]
    fn other_actions_and_events_are_ignored() {
        assert!(matches!(
            decide("pull_request", &pr_body("closed")).unwrap(),
            WebhookDecision::Ignore(_)
        ));
        assert!(matches!(
            decide("workflow_run", b"not even json").unwrap(),
            WebhookDecision::Ignore(_)
        ));
        assert!(matches!(
            decide("ping", b"{}").unwrap(),
            WebhookDecision::Ignore(_)
        ));
    }

    #[test]
    fn malformed_pull_request_body_is_an_error() {
        assert!(decide("pull_request", b"{\"action\":\"opened\"}").is_err());
    }
}
