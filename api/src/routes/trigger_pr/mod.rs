pub mod trigger_pr_request;
pub mod trigger_pr_route;
