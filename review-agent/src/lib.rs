//! Client side of the external review agent.
//!
//! - [`services::http_agent::HttpReviewAgent`]: implements
//!   `pr_context_engine::ReviewAgent` over HTTP
//! - [`normalize`]: turns loosely shaped agent output into review comments
//! - [`telemetry`]: logging layer scoped to this crate

pub mod config;
pub mod error_handler;
pub mod normalize;
pub mod services;
pub mod telemetry;

pub use config::AgentConfig;
pub use error_handler::{AgentError, Result};
pub use services::http_agent::HttpReviewAgent;
