//! Rendering and delivery of a [`RunResult`].
//!
//! `render` is pure formatting; [`Reporter`] implementations decide where
//! the document goes (stdout, a JSON artifact on disk, ...).

use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::metrics::{CounterRate, MetricsSnapshot};
use crate::runner::RunResult;

const BANNER: &str =
    "================================================================================";

/// Default path of the persisted JSON artifact.
pub const DEFAULT_RESULTS_PATH: &str = "performance_results.json";

/// Render the result document as a human-readable report.
///
/// Always succeeds, even when every sub-test failed: empty sections render
/// as their markers rather than crashing the formatter.
pub fn render(result: &RunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "Distributed Stack Performance Report");
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(
        out,
        "Run started: {}",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Query subsystem:");
    if result.query.is_empty() {
        let _ = writeln!(out, "  (unreachable, sub-tests skipped)");
    }
    for (name, stats) in &result.query {
        let _ = writeln!(out, "  {name}:");
        let _ = writeln!(out, "    samples:      {}", stats.total);
        let _ = writeln!(out, "    success rate: {:.2}%", stats.success_rate * 100.0);
        if let Some(latency) = &stats.latency {
            let _ = writeln!(out, "    mean latency:   {:.3}s", latency.mean);
            let _ = writeln!(out, "    median latency: {:.3}s", latency.median);
            let _ = writeln!(out, "    max latency:    {:.3}s", latency.max);
        }
        if let Some(qps) = stats.throughput {
            let _ = writeln!(out, "    throughput:   {qps:.2} QPS");
        }
        if let Some(marker) = stats.error {
            let _ = writeln!(out, "    note: {marker}");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Log pipeline:");
    render_snapshot(&mut out, "edge", &result.pipeline.edge_metrics);
    render_snapshot(&mut out, "aggregator", &result.pipeline.aggregator_metrics);
    let rate = &result.pipeline.processing_rate;
    let _ = writeln!(out, "  processing rate ({:.0}s window):", rate.window_secs);
    let _ = writeln!(
        out,
        "    edge:       {}",
        render_rate(rate.edge_events_per_second)
    );
    let _ = writeln!(
        out,
        "    aggregator: {}",
        render_rate(rate.aggregator_events_per_second)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Host resources:");
    for (key, value) in &result.resources {
        let _ = writeln!(out, "  {key}: {value}");
    }
    let _ = writeln!(out, "{BANNER}");
    out
}

fn render_snapshot(out: &mut String, name: &str, snapshot: &MetricsSnapshot) {
    match &snapshot.error {
        Some(error) => {
            let _ = writeln!(out, "  {name} metrics: unavailable ({error})");
        }
        None => {
            let _ = writeln!(out, "  {name} metrics: {} series", snapshot.values.len());
        }
    }
}

fn render_rate(rate: CounterRate) -> String {
    match rate {
        CounterRate::PerSecond(r) => format!("{r:.2} events/s"),
        CounterRate::Indeterminate => "indeterminate (counter reset)".to_string(),
    }
}

/// Sink for finished result documents.
#[async_trait]
pub trait Reporter {
    async fn report(&self, result: &RunResult) -> Result<()>;
}

/// Prints the rendered report to standard output.
pub struct StdoutReporter;

#[async_trait]
impl Reporter for StdoutReporter {
    async fn report(&self, result: &RunResult) -> Result<()> {
        println!("{}", render(result));
        Ok(())
    }
}

/// Writes the result document, pretty-printed, to a JSON file.
pub struct JsonFileReporter {
    pub path: PathBuf,
}

impl Default for JsonFileReporter {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_RESULTS_PATH),
        }
    }
}

#[async_trait]
impl Reporter for JsonFileReporter {
    async fn report(&self, result: &RunResult) -> Result<()> {
        let encoded = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&self.path, encoded).await?;
        tracing::info!(path = %self.path.display(), "results written");
        Ok(())
    }
}
