pub mod github_webhook;
pub mod health_route;
pub mod trigger_pr;
