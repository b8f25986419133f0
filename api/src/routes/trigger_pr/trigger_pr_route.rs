use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use pr_context_engine::{git_providers::ChangeRequestId, run_review};
use tracing::{debug, info, instrument};

use crate::{
    core::{
        app_state::AppState,
        http::response_envelope::{ApiErrorDetail, ApiResponse},
    },
    error_handler::AppError,
    routes::trigger_pr::trigger_pr_request::TriggerPrRequest,
};

/// POST /trigger/github/pr
///
/// Runs the review inline and returns the [`pr_context_engine::ReviewReport`].
/// Requires `secret` to match `TRIGGER_SECRET`; an empty server secret
/// disables the route.
#[instrument(
    name = "trigger_pr_route",
    skip(state, headers, body),
    fields(repository = %body.repository, pr = body.pr_number)
)]
pub async fn trigger_pr_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TriggerPrRequest>,
) -> Response {
    if let Some(id) = headers.get("X-Request-Id").and_then(|h| h.to_str().ok()) {
        debug!(%id, "request id attached");
    }

    // --- Validate shared secret -------------------------------------------------
    let expected_secret = state.config.trigger_secret.trim();
    let provided_secret = body.secret.trim();

    if expected_secret.is_empty() {
        return ApiResponse::<()>::error(
            "SERVER_CONFIG_ERROR",
            "Trigger secret is not configured.",
            vec![ApiErrorDetail::field(
                "secret",
                "Trigger secret is not configured on the server side.",
            )],
        )
        .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    if provided_secret.is_empty() || provided_secret != expected_secret {
        return ApiResponse::<()>::error(
            "UNAUTHORIZED",
            "Invalid trigger secret.",
            vec![ApiErrorDetail::field(
                "secret",
                "Secret does not match the configured trigger secret.",
            )],
        )
        .into_response_with_status(StatusCode::UNAUTHORIZED);
    }

    let id = ChangeRequestId {
        project: body.repository.trim().to_string(),
        iid: body.pr_number,
    };
    info!(project = %id.project, iid = id.iid, "manual pull request review triggered");

    // --- Run review pipeline ----------------------------------------------------
    match run_review(&state.github, &state.agent, &id, &state.review).await {
        Ok(report) => ApiResponse::success(report).into_response_with_status(StatusCode::OK),
        Err(err) => AppError::from(err).into_response(),
    }
}
