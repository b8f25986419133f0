//! Comment planning: decide where each review comment can actually land.
//!
//! Every comment is validated against the parsed diff before posting. What
//! happens to a comment whose line is not part of the diff is a caller
//! policy ([`FallbackPolicy`]); the resolver never guesses on its own.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::errors::ConfigError;
use crate::git_providers::types::ParsedDiff;
use crate::resolver::{
    first_added_line_in, first_addition, first_right_side_line, resolve_comment_line,
};
use crate::review::ReviewComment;

/// What to do with a comment whose line is not addressable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Skip the comment.
    #[default]
    Drop,
    /// Move it to the first added line of the same file, or the first
    /// right-side line of its first hunk.
    FileFirstLine,
    /// Move it to the first added line of the whole diff, noting where it
    /// was meant to go.
    DiffFirstAddition,
}

impl FromStr for FallbackPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(FallbackPolicy::Drop),
            "file" => Ok(FallbackPolicy::FileFirstLine),
            "diff" => Ok(FallbackPolicy::DiffFirstAddition),
            other => Err(ConfigError::InvalidValue {
                var: "COMMENT_FALLBACK",
                reason: format!("expected drop|file|diff, got '{other}'"),
            }),
        }
    }
}

/// Publishing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishConfig {
    /// Log the comments instead of posting them.
    pub dry_run: bool,
    /// Pause between consecutive comment posts.
    pub post_delay: Duration,
    pub fallback: FallbackPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            post_delay: Duration::from_millis(100),
            fallback: FallbackPolicy::Drop,
        }
    }
}

/// Comments ready to post, plus what happened to the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPlan {
    pub comments: Vec<ReviewComment>,
    /// Comments moved to a fallback line.
    pub relocated: usize,
    /// Comments that will not be posted at all.
    pub dropped: usize,
}

/// Outcome counts of one publishing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub posted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Validates every comment against `diff` and applies `policy` to the
/// ones whose line is not part of it. Comments on files absent from the
/// diff are always dropped.
pub fn plan_comments(
    diff: &ParsedDiff,
    comments: Vec<ReviewComment>,
    policy: FallbackPolicy,
) -> CommentPlan {
    let mut plan = CommentPlan::default();

    for comment in comments {
        let Some(file) = diff.get(&comment.path) else {
            debug!(path = %comment.path, line = comment.line, "comment targets a file outside the diff, dropping");
            plan.dropped += 1;
            continue;
        };

        if resolve_comment_line(file, comment.line).valid {
            plan.comments.push(comment);
            continue;
        }

        let moved = match policy {
            FallbackPolicy::Drop => None,
            FallbackPolicy::FileFirstLine => first_addition(file)
                .or_else(|| first_right_side_line(file))
                .map(|line| ReviewComment {
                    line,
                    ..comment.clone()
                }),
            FallbackPolicy::DiffFirstAddition => {
                first_added_line_in(diff).map(|target| ReviewComment {
                    body: format!(
                        "**Original location:** `{}:{}`\n\n{}",
                        comment.path, comment.line, comment.body
                    ),
                    path: target.path,
                    line: target.line,
                })
            }
        };

        match moved {
            Some(relocated) => {
                debug!(
                    path = %comment.path,
                    from = comment.line,
                    to_path = %relocated.path,
                    to = relocated.line,
                    ?policy,
                    "comment line outside the diff, relocated"
                );
                plan.relocated += 1;
                plan.comments.push(relocated);
            }
            None => {
                debug!(path = %comment.path, line = comment.line, ?policy, "comment line outside the diff, dropping");
                plan.dropped += 1;
            }
        }
    }

    plan
}
