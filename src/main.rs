use std::time::Duration;

use tracing_subscriber::EnvFilter;

use stackbench::report::{JsonFileReporter, Reporter, StdoutReporter};
use stackbench::runner::{RunConfig, Runner};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RunConfig::builder()
        .query_endpoint(env_or("STACKBENCH_QUERY_ENDPOINT", "http://localhost:50051"))
        .edge_endpoint(env_or("STACKBENCH_EDGE_ENDPOINT", "http://localhost:9598"))
        .aggregator_endpoint(env_or(
            "STACKBENCH_AGGREGATOR_ENDPOINT",
            "http://localhost:9599",
        ))
        .throughput_window(env_secs("STACKBENCH_THROUGHPUT_SECS", 30))
        .rate_window(env_secs("STACKBENCH_RATE_WINDOW_SECS", 30))
        .build();

    tracing::info!("starting distributed stack performance run");
    let result = Runner::new(config).run().await;

    StdoutReporter.report(&result).await?;

    // Partial sub-test failures are reported in-band; only a broken sink
    // is worth a log line, and even that does not change the exit status.
    if let Err(e) = JsonFileReporter::default().report(&result).await {
        tracing::error!(error = %e, "failed to persist results");
    }

    tracing::info!("performance run complete");
    Ok(())
}
