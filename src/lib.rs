//! Stackbench — a performance-measurement harness for a distributed
//! query + log-pipeline stack.
//!
//! The harness drives load against a query-serving endpoint, times every
//! operation, harvests the log pipeline's exposed counters over a rate
//! window, and reduces everything into one result document.
//!
//! # Architecture
//!
//! The building blocks, leaf first:
//!
//! - [`sample::Sample`]: one timed operation's outcome, produced by
//!   [`sample::Operation::run_timed`] (the clock).
//! - [`executor`]: the three execution modes — sequential-repeated,
//!   bounded-concurrency, and a duration-bounded throughput loop. All of
//!   them isolate failures into failure samples (bulkhead semantics).
//! - [`aggregate`]: pure, order-independent reduction of samples into
//!   latency/throughput statistics.
//! - [`metrics`]: the `/metrics` scraper and the rate-window calculator
//!   that differences two counter snapshots over a known duration.
//! - [`query`]: the query subsystem client, a black box behind a narrow
//!   connect/execute contract with a pull-based row-batch stream.
//! - [`runner`]: the linear orchestrator assembling a [`runner::RunResult`]
//!   out of all of the above; partial results are preferred over aborting.
//! - [`report`]: text rendering plus [`report::Reporter`] sinks (stdout,
//!   JSON artifact).
//!
//! Both subsystems are read-only external resources reached over HTTP; the
//! harness observes, it never mutates. Nothing in the core is fatal to the
//! process: every failure ends up as data in the final report.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use stackbench::report::{Reporter, StdoutReporter};
//! use stackbench::runner::{RunConfig, Runner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RunConfig::builder()
//!         .query_endpoint("http://localhost:50051")
//!         .rate_window(Duration::from_secs(30))
//!         .build();
//!     let result = Runner::new(config).run().await;
//!     StdoutReporter.report(&result).await.unwrap();
//! }
//! ```

/// Sample reduction into summary statistics
pub mod aggregate;
/// Error taxonomy
pub mod error;
/// The three execution modes
pub mod executor;
/// Counter scraping and rate windows
pub mod metrics;
/// Query subsystem client
pub mod query;
/// Report rendering and sinks
pub mod report;
/// Host resource snapshot
pub mod resources;
/// The run orchestrator
pub mod runner;
/// Samples, operations and the timing wrapper
pub mod sample;

pub use aggregate::{AggregateStats, aggregate};
pub use error::{Error, Result};
pub use executor::{ConcurrentExecutor, SequentialExecutor, ThroughputExecutor};
pub use metrics::{CounterRate, MetricsScraper, MetricsSnapshot, counter_rate};
pub use query::QueryClient;
pub use report::{Reporter, render};
pub use runner::{RunConfig, RunResult, Runner};
pub use sample::{OpOutput, Operation, Sample};
