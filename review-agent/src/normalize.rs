//! Normalization of loosely shaped agent output into [`ReviewComment`]s.
//!
//! The agent is asked for `[{path, line, body}]` but language models drift:
//! they use `file` or `location.file`, send lines as strings, or split the
//! body into `severity` / `issue` / `suggestion`. Everything that can be
//! mapped unambiguously is mapped; the rest is rejected per comment.

use pr_context_engine::ReviewComment;
use serde_json::Value;
use thiserror::Error;

/// Why a single agent comment was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("comment is not a JSON object")]
    NotAnObject,
    #[error("comment has no file path")]
    MissingPath,
    #[error("comment line is not a positive integer: {0}")]
    InvalidLine(String),
    #[error("comment has no body or issue description")]
    MissingBody,
}

/// Finds the comment list inside an agent response.
///
/// Accepts `{"comments": [...]}`, a bare array, or free text containing a
/// JSON array (first `[` to last `]`). Returns `None` when nothing parses.
pub fn extract_comments(text: &str) -> Option<Vec<Value>> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        match value {
            Value::Array(items) => return Some(items),
            Value::Object(mut map) => {
                if let Some(Value::Array(items)) = map.remove("comments") {
                    return Some(items);
                }
            }
            _ => {}
        }
    }

    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Maps one agent comment to a [`ReviewComment`].
pub fn normalize_comment(raw: &Value) -> Result<ReviewComment, Rejection> {
    let obj = raw.as_object().ok_or(Rejection::NotAnObject)?;

    let path = ["path", "file"]
        .iter()
        .find_map(|k| non_empty_str(obj.get(*k)))
        .or_else(|| non_empty_str(raw.pointer("/location/file")))
        .ok_or(Rejection::MissingPath)?;

    let line = parse_line(obj.get("line"))?;

    let body = match non_empty_str(obj.get("body")) {
        Some(body) => body.to_string(),
        None => compose_body(obj).ok_or(Rejection::MissingBody)?,
    };

    Ok(ReviewComment {
        path: path.to_string(),
        line,
        body,
    })
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Missing, null or zero means "no specific line" and maps to line 1.
fn parse_line(v: Option<&Value>) -> Result<u32, Rejection> {
    let n = match v {
        None | Some(Value::Null) => return Ok(1),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match n {
        Some(0) => Ok(1),
        Some(n) if n > 0 => u32::try_from(n).map_err(|_| Rejection::InvalidLine(n.to_string())),
        _ => Err(Rejection::InvalidLine(
            v.map(Value::to_string).unwrap_or_default(),
        )),
    }
}

/// Builds a body from `severity`/`issue_type`, `issue`/`message`/`description`
/// and `suggestion`. `None` when none of them is present.
fn compose_body(obj: &serde_json::Map<String, Value>) -> Option<String> {
    let severity = ["severity", "issue_type"]
        .iter()
        .find_map(|k| non_empty_str(obj.get(*k)));
    let issue = ["issue", "message", "description"]
        .iter()
        .find_map(|k| non_empty_str(obj.get(*k)));
    let suggestion = non_empty_str(obj.get("suggestion"));

    if severity.is_none() && issue.is_none() && suggestion.is_none() {
        return None;
    }

    let severity = severity.unwrap_or("info");
    let mut body = format!(
        "{} **{}**: {}",
        severity_emoji(severity),
        severity.to_uppercase(),
        issue.unwrap_or("Issue detected")
    );
    if let Some(s) = suggestion {
        body.push_str("\n\n💡 **Suggestion**: ");
        body.push_str(s);
    }
    Some(body)
}

fn severity_emoji(severity: &str) -> &'static str {
    fn any_of(s: &str, words: &[&str]) -> bool {
        words.iter().any(|w| s.contains(w))
    }

    let s = severity.to_lowercase();
    if any_of(&s, &["error", "bug", "critical"]) {
        "🐛"
    } else if any_of(&s, &["warning", "medium", "minor"]) {
        "⚠️"
    } else if s.contains("security") {
        "🔒"
    } else if s.contains("performance") {
        "⚡"
    } else {
        "📝"
    }
}
