use serde::Deserialize;

/// Request body for manually triggering a pull request review.
#[derive(Debug, Deserialize)]
pub struct TriggerPrRequest {
    /// "owner/repo".
    pub repository: String,
    pub pr_number: u64,
    /// Shared secret used to protect the endpoint from unauthorized calls.
    pub secret: String,
}
