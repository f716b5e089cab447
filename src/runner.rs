//! The run orchestrator: a linear battery of sub-tests against the query
//! subsystem, a rate window over the log pipeline's counters, and a host
//! resource snapshot, assembled into one [`RunResult`].
//!
//! The sequence never branches or retries. A query connect failure skips
//! that subsystem's sub-tests; everything downstream still runs, because a
//! partial result beats an aborted run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use typed_builder::TypedBuilder;

use crate::aggregate::{AggregateStats, aggregate};
use crate::executor::{ConcurrentExecutor, SequentialExecutor, ThroughputExecutor};
use crate::metrics::{CounterRate, MetricsScraper, MetricsSnapshot, counter_rate};
use crate::query::QueryClient;
use crate::sample::Operation;
use crate::resources;

/// Battery of queries driven against the query subsystem.
pub const TEST_QUERIES: [&str; 5] = [
    "SELECT * FROM users LIMIT 100",
    "SELECT COUNT(*) FROM users",
    "SELECT city, COUNT(*) FROM users GROUP BY city",
    "SELECT AVG(age) FROM users",
    "SELECT * FROM users WHERE age > 30",
];

/// Cheap query used for the sustained-throughput loop.
pub const THROUGHPUT_QUERY: &str = "SELECT * FROM users LIMIT 10";

/// Monotonic counter differenced over the rate window.
pub const EVENTS_COUNTER: &str = "vector_events_processed_total";

/// Full configuration of one run. Defaults match the standard battery:
/// 5 repeats, 3 concurrent workers, 30 s throughput and rate windows.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RunConfig {
    #[builder(default = "http://localhost:50051".into(), setter(into))]
    pub query_endpoint: String,
    #[builder(default = "http://localhost:9598".into(), setter(into))]
    pub edge_endpoint: String,
    #[builder(default = "http://localhost:9599".into(), setter(into))]
    pub aggregator_endpoint: String,
    #[builder(default = 5)]
    pub repeats: usize,
    #[builder(default = 3)]
    pub concurrency: usize,
    #[builder(default = Duration::from_secs(30))]
    pub throughput_window: Duration,
    #[builder(default = Duration::from_secs(30))]
    pub rate_window: Duration,
    #[builder(default = Duration::from_millis(100))]
    pub pacing: Duration,
}

/// Per-second event rates inferred from the pipeline's counters.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingRate {
    pub window_secs: f64,
    pub edge_events_per_second: CounterRate,
    pub aggregator_events_per_second: CounterRate,
}

/// Log-pipeline section of the result document.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResults {
    pub edge_metrics: MetricsSnapshot,
    pub aggregator_metrics: MetricsSnapshot,
    pub processing_rate: ProcessingRate,
}

/// Top-level result document, built once per run and serialized at the end.
#[derive(Debug, Serialize)]
pub struct RunResult {
    pub timestamp: DateTime<Utc>,
    /// Sub-test name → aggregate; empty when the query subsystem was
    /// unreachable.
    pub query: BTreeMap<String, AggregateStats>,
    pub pipeline: PipelineResults,
    pub resources: BTreeMap<String, String>,
}

/// Drives the full battery per its [`RunConfig`].
#[derive(Debug, Clone)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run the battery end to end. Never fails: every subsystem error is
    /// captured in the result document instead.
    pub async fn run(&self) -> RunResult {
        let cfg = &self.config;
        let timestamp = Utc::now();

        let query = match QueryClient::connect(&cfg.query_endpoint).await {
            Ok(client) => self.query_battery(Arc::new(client)).await,
            Err(e) => {
                tracing::warn!(endpoint = %cfg.query_endpoint, error = %e, "skipping query sub-tests");
                BTreeMap::new()
            }
        };

        let pipeline = self.pipeline_battery().await;

        tracing::info!("collecting host resource snapshot");
        let resources = resources::collect();

        RunResult {
            timestamp,
            query,
            pipeline,
            resources,
        }
    }

    async fn query_battery(&self, client: Arc<QueryClient>) -> BTreeMap<String, AggregateStats> {
        let cfg = &self.config;
        let ops: Vec<Operation> = TEST_QUERIES.iter().map(|sql| client.operation(sql)).collect();
        let mut results = BTreeMap::new();

        tracing::info!(repeats = cfg.repeats, "running single-query sub-test");
        let single = SequentialExecutor::builder()
            .repeats(cfg.repeats)
            .pacing(cfg.pacing)
            .build()
            .run(&ops)
            .await;
        results.insert("single_query".to_string(), aggregate(&single));

        tracing::info!(limit = cfg.concurrency, "running concurrent-query sub-test");
        let concurrent = ConcurrentExecutor::builder()
            .limit(cfg.concurrency)
            .build()
            .run(&ops)
            .await;
        results.insert("concurrent_query".to_string(), aggregate(&concurrent));

        tracing::info!(window = ?cfg.throughput_window, "running throughput sub-test");
        let throughput = ThroughputExecutor::builder()
            .duration(cfg.throughput_window)
            .build()
            .run(&client.operation(THROUGHPUT_QUERY))
            .await;
        results.insert("throughput".to_string(), aggregate(&throughput));

        results
    }

    async fn pipeline_battery(&self) -> PipelineResults {
        let cfg = &self.config;
        let scraper = MetricsScraper::default();

        let edge_before = scraper.scrape(&cfg.edge_endpoint).await;
        let agg_before = scraper.scrape(&cfg.aggregator_endpoint).await;

        tracing::info!(window = ?cfg.rate_window, "waiting out the rate window");
        tokio::time::sleep(cfg.rate_window).await;

        let edge_after = scraper.scrape(&cfg.edge_endpoint).await;
        let agg_after = scraper.scrape(&cfg.aggregator_endpoint).await;

        let processing_rate = ProcessingRate {
            window_secs: cfg.rate_window.as_secs_f64(),
            edge_events_per_second: counter_rate(
                &edge_before,
                &edge_after,
                cfg.rate_window,
                EVENTS_COUNTER,
            ),
            aggregator_events_per_second: counter_rate(
                &agg_before,
                &agg_after,
                cfg.rate_window,
                EVENTS_COUNTER,
            ),
        };

        PipelineResults {
            edge_metrics: edge_after,
            aggregator_metrics: agg_after,
            processing_rate,
        }
    }
}
