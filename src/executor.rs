//! Execution modes for driving batches of operations.
//!
//! Three executors cover the harness's needs:
//!
//! - [`SequentialExecutor`]: each operation `repeats` times, in list order,
//!   with a fixed pacing delay to avoid overload bias.
//! - [`ConcurrentExecutor`]: at most `limit` operations in flight; samples
//!   come back in completion order, not submission order.
//! - [`ThroughputExecutor`]: one operation back-to-back until a wall-clock
//!   deadline, reporting the running rate as it goes.
//!
//! All modes have bulkhead semantics: a failing operation yields a failure
//! [`Sample`] and never aborts its siblings.

use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use crate::sample::{Operation, Sample};

/// Runs each operation `repeats` times in list order, single-stream.
///
/// Sample order is deterministic: all repeats of the first operation, then
/// all repeats of the second, and so on.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SequentialExecutor {
    #[builder(default = 5)]
    pub repeats: usize,
    /// Delay inserted after every invocation.
    #[builder(default = Duration::from_millis(100))]
    pub pacing: Duration,
}

impl SequentialExecutor {
    pub async fn run(&self, ops: &[Operation]) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(ops.len() * self.repeats);
        for op in ops {
            tracing::info!(operation = op.label(), "sequential sub-test");
            for _ in 0..self.repeats {
                samples.push(op.run_timed().await);
                tokio::time::sleep(self.pacing).await;
            }
        }
        samples
    }
}

/// Dispatches operations with at most `limit` in flight; a finished slot is
/// immediately reused for the next pending operation.
///
/// Returned samples are in completion order. Callers must not assume FIFO.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ConcurrentExecutor {
    #[builder(default = 3)]
    pub limit: usize,
}

impl ConcurrentExecutor {
    pub async fn run(&self, ops: &[Operation]) -> Vec<Sample> {
        stream::iter(ops)
            .map(|op| op.run_timed())
            .buffer_unordered(self.limit.max(1))
            .collect()
            .await
    }
}

/// Repeats one operation back-to-back until `duration` has elapsed.
///
/// The deadline is checked before each new invocation, so total wall time
/// may overshoot by up to one operation's duration; in-flight work is never
/// preempted.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ThroughputExecutor {
    pub duration: Duration,
    /// Log the running rate every this many invocations.
    #[builder(default = 10)]
    pub log_every: usize,
}

impl ThroughputExecutor {
    pub async fn run(&self, op: &Operation) -> Vec<Sample> {
        let started = Instant::now();
        let mut samples = Vec::new();

        while started.elapsed() < self.duration {
            samples.push(op.run_timed().await);

            if self.log_every > 0 && samples.len() % self.log_every == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                let rate = samples.len() as f64 / elapsed;
                tracing::info!(
                    operation = op.label(),
                    count = samples.len(),
                    rate_per_sec = rate,
                    "throughput progress"
                );
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::Error;
    use crate::sample::OpOutput;

    fn instant_op(label: &str) -> Operation {
        Operation::new(label, || async { Ok(OpOutput { rows: 1 }) })
    }

    fn failing_op(label: &str) -> Operation {
        Operation::new(label, || async {
            Err::<OpOutput, _>(Error::Operation("down".into()))
        })
    }

    #[tokio::test]
    async fn sequential_order_is_deterministic() {
        let ops = vec![instant_op("a"), instant_op("b")];
        let executor = SequentialExecutor::builder()
            .repeats(3)
            .pacing(Duration::ZERO)
            .build();

        let samples = executor.run(&ops).await;
        let labels: Vec<&str> = samples.iter().map(|s| s.operation.as_str()).collect();
        assert_eq!(labels, ["a", "a", "a", "b", "b", "b"]);
    }

    #[tokio::test]
    async fn bounded_concurrency_yields_one_sample_per_operation() {
        // Failures mixed in: bulkhead semantics must keep siblings alive.
        let ops = vec![
            instant_op("q1"),
            failing_op("q2"),
            instant_op("q3"),
            failing_op("q4"),
            instant_op("q5"),
        ];
        for limit in [1, 2, 3, 16] {
            let samples = ConcurrentExecutor::builder()
                .limit(limit)
                .build()
                .run(&ops)
                .await;
            assert_eq!(samples.len(), ops.len(), "limit {limit}");
            assert_eq!(samples.iter().filter(|s| !s.success).count(), 2);
        }
    }

    #[tokio::test]
    async fn bounded_concurrency_never_exceeds_limit() {
        let limit = 3;
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let ops: Vec<Operation> = (0..12)
            .map(|i| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                Operation::new(format!("op-{i}"), move || {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(OpOutput { rows: 0 })
                    }
                })
            })
            .collect();

        let samples = ConcurrentExecutor::builder()
            .limit(limit)
            .build()
            .run(&ops)
            .await;
        assert_eq!(samples.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= limit);
    }

    #[tokio::test]
    async fn throughput_loop_runs_for_at_least_the_window() {
        let op = Operation::new("tick", || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(OpOutput { rows: 0 })
        });
        let window = Duration::from_millis(100);
        let started = Instant::now();
        let samples = ThroughputExecutor::builder()
            .duration(window)
            .build()
            .run(&op)
            .await;

        assert!(started.elapsed() >= window);
        // Roughly window / op duration, with slack for scheduling jitter.
        assert!(samples.len() >= 5 && samples.len() <= 20, "{}", samples.len());
    }

    #[tokio::test]
    async fn throughput_loop_tolerates_failures() {
        let op = failing_op("down");
        let samples = ThroughputExecutor::builder()
            .duration(Duration::from_millis(20))
            .build()
            .run(&op)
            .await;

        assert!(!samples.is_empty());
        assert!(samples.iter().all(|s| !s.success));
    }
}
