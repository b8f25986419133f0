use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use pr_context_engine::run_review;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    core::{
        app_state::AppState,
        http::response_envelope::{ApiErrorDetail, ApiResponse},
    },
    error_handler::AppError,
    routes::github_webhook::webhook_payload::{WebhookAck, WebhookDecision, decide},
};

/// POST /webhooks/github
///
/// Code-changing `pull_request` actions start a review in the background
/// and answer 202 right away; GitHub gives up on deliveries after 10s.
/// Everything else is acknowledged with 200 and ignored.
#[instrument(
    name = "github_webhook_route",
    skip_all,
    fields(event = tracing::field::Empty, delivery = tracing::field::Empty)
)]
pub async fn github_webhook_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let event = header("X-GitHub-Event");
    let delivery = header("X-GitHub-Delivery");
    tracing::Span::current().record("event", event.as_str());
    tracing::Span::current().record("delivery", delivery.as_str());

    if event.is_empty() {
        return ApiResponse::<()>::error(
            "BAD_REQUEST",
            "Missing X-GitHub-Event header.",
            vec![ApiErrorDetail::field("X-GitHub-Event", "Send the GitHub event name.")],
        )
        .into_response_with_status(StatusCode::BAD_REQUEST);
    }

    let decision = match decide(&event, &body) {
        Ok(d) => d,
        Err(err) => {
            warn!(error = %err, "unreadable pull_request payload");
            return AppError::from(err).into_response();
        }
    };

    match decision {
        WebhookDecision::Ignore(reason) => {
            debug!(%reason, "webhook ignored");
            ApiResponse::success(WebhookAck {
                status: "ignored",
                repository: None,
                pr_number: None,
                reason: Some(reason),
            })
            .into_response_with_status(StatusCode::OK)
        }
        WebhookDecision::Review { id, head_sha } => {
            info!(project = %id.project, iid = id.iid, %head_sha, "pull request review scheduled");

            let ack = WebhookAck {
                status: "accepted",
                repository: Some(id.project.clone()),
                pr_number: Some(id.iid),
                reason: None,
            };

            let task_state = Arc::clone(&state);
            tokio::spawn(async move {
                let st = task_state.as_ref();
                match run_review(&st.github, &st.agent, &id, &st.review).await {
                    Ok(report) => info!(
                        project = %id.project,
                        iid = id.iid,
                        posted = report.publish.posted,
                        failed = report.publish.failed,
                        "background review finished"
                    ),
                    Err(err) => error!(project = %id.project, iid = id.iid, error = %err, "background review failed"),
                }
            });

            ApiResponse::success(ack).into_response_with_status(StatusCode::ACCEPTED)
        }
    }
}
