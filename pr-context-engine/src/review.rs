//! Review agent seam: what goes in, what comes back.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::git_providers::types::PrAnalysis;

/// One inline finding, targeted at a new-file line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub path: String,
    pub line: u32,
    pub body: String,
}

/// Result of a review attempt. Failures are data, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub success: bool,
    pub comments: Vec<ReviewComment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReviewOutcome {
    pub fn succeeded(comments: Vec<ReviewComment>) -> Self {
        Self {
            success: true,
            comments,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            comments: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Produces review comments for an assembled pull request.
pub trait ReviewAgent {
    fn review(&self, analysis: &PrAnalysis) -> impl Future<Output = ReviewOutcome> + Send;
}
