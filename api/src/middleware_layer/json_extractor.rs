//! Wraps axum's plain-text extractor rejections into the JSON envelope.
//!
//! Handlers already answer with [`ApiResponse`]; only non-JSON 400/415/422
//! bodies (produced by `Json<T>` rejections before a handler runs) are
//! rewritten.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Rejection bodies are short; anything larger is not ours to rewrite.
const MAX_REJECTION_BODY: usize = 64 * 1024;

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REJECTION_BODY)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

/// serde messages read like "missing field `pr_number` at line 1 column 30".
fn field_from_serde_msg(msg: &str) -> Option<String> {
    let start = msg.find('`')? + 1;
    let len = msg[start..].find('`')?;
    Some(msg[start..start + len].to_string())
}

fn ensure_request_id(parts: &mut axum::http::response::Parts) -> String {
    if let Some(v) = parts
        .headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        return v.to_string();
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let id = format!("req-{nanos}");
    if let Ok(value) = HeaderValue::from_str(&id) {
        parts.headers.insert("X-Request-Id", value);
    }
    id
}

fn is_json(parts: &axum::http::response::Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    let code = match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
        StatusCode::UNPROCESSABLE_ENTITY => "UNPROCESSABLE_ENTITY",
        _ => return res,
    };

    let (mut parts, bytes) = take_body(res).await;
    if is_json(&parts) {
        return Response::from_parts(parts, bytes.into());
    }

    let original = String::from_utf8_lossy(&bytes).trim().to_string();
    let req_id = ensure_request_id(&mut parts);
    debug!(%req_id, status = status.as_u16(), message = %original, "request body rejected");

    let hint = if original.contains("Content-Type") {
        Some("Send the body with `Content-Type: application/json`.".to_string())
    } else if original.contains("missing field") {
        Some("A required field is missing from the JSON body.".to_string())
    } else if original.contains("invalid type") {
        Some("A field has the wrong JSON type.".to_string())
    } else {
        None
    };
    let details = vec![ApiErrorDetail {
        path: field_from_serde_msg(&original),
        hint,
    }];

    let envelope = ApiResponse::<()>::error(code, original, details);
    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    Response::from_parts(parts, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_is_read_from_serde_message() {
        assert_eq!(
            field_from_serde_msg(
                "Failed to deserialize the JSON body into the target type: missing field `pr_number` at line 1 column 30"
            )
            .as_deref(),
            Some("pr_number")
        );
        assert_eq!(field_from_serde_msg("EOF while parsing"), None);
    }
}
