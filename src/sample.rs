//! The smallest unit of measurement: one timed operation invocation.
//!
//! An [`Operation`] wraps a zero-argument async closure returning a tagged
//! success/failure outcome; [`Operation::run_timed`] is the clock that turns
//! exactly one invocation into a [`Sample`]. Executors are written against
//! `Operation`, never against concrete query strings, so heterogeneous
//! batches run uniformly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::Error;

/// Successful outcome of one operation, with the size the caller can
/// extract from it (row count for queries, 0 when not meaningful).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpOutput {
    pub rows: u64,
}

/// One timed operation's outcome. Immutable once created; discarded after
/// aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label of the operation that produced this sample.
    pub operation: String,
    /// Wall-clock end minus start, computed even on failure.
    pub duration: Duration,
    pub success: bool,
    /// Present iff the operation failed.
    pub error: Option<String>,
    /// Extra per-sample data, e.g. `row_count`.
    pub metadata: BTreeMap<String, Value>,
}

impl Sample {
    pub fn success(operation: impl Into<String>, duration: Duration, rows: u64) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("row_count".to_string(), Value::from(rows));
        Self {
            operation: operation.into(),
            duration,
            success: true,
            error: None,
            metadata,
        }
    }

    pub fn failure(
        operation: impl Into<String>,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            duration,
            success: false,
            error: Some(error.into()),
            metadata: BTreeMap::new(),
        }
    }
}

type Action = Arc<dyn Fn() -> BoxFuture<'static, Result<OpOutput, Error>> + Send + Sync>;

/// A labelled, repeatable unit of work.
///
/// Cloning is cheap; the underlying closure is shared. Heavy objects
/// (clients, connection pools) belong inside the closure's captured state,
/// never constructed per invocation.
#[derive(Clone)]
pub struct Operation {
    label: String,
    action: Action,
}

impl Operation {
    pub fn new<F, Fut>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OpOutput, Error>> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Arc::new(move || Box::pin(action())),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Execute the operation exactly once and clock it.
    ///
    /// Never retries and never propagates: a failing operation yields a
    /// failure [`Sample`] carrying the error description. Duration covers
    /// the full invocation either way.
    pub async fn run_timed(&self) -> Sample {
        let start = Instant::now();
        let outcome = (self.action)().await;
        let duration = start.elapsed();
        match outcome {
            Ok(out) => Sample::success(&self.label, duration, out.rows),
            Err(e) => Sample::failure(&self.label, duration, e.to_string()),
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
