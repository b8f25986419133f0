use std::error::Error;

use tracing::{Level, info, warn};
use tracing_subscriber::{Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // `.env` is optional; real deployments pass the environment directly.
    let dotenv = dotenvy::dotenv();

    let env_filter = review_agent::telemetry::env_filter_with_level("info", Level::INFO);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_filter(filter::filter_fn(|meta| {
                    !meta.target().starts_with(review_agent::telemetry::TARGET_PREFIX)
                })),
        )
        .with(review_agent::telemetry::layer())
        .init();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "ignoring unreadable .env"),
    }

    api::start().await?;

    Ok(())
}
