pub mod http_agent;
