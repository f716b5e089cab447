//! Pure reduction of [`Sample`]s into summary statistics.
//!
//! No I/O, no side effects, and order-independent: every statistic here is
//! a function of the multiset of samples, so the completion-order shuffling
//! of the concurrent executor cannot change the result.

use serde::Serialize;

use crate::sample::Sample;

/// Marker used when a batch produced no successful samples.
pub const NO_SUCCESSES: &str = "no successful samples";

/// Latency distribution of the successful samples, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n − 1 divisor); 0 with fewer than two
    /// successes. Documented policy, matching `statistics.stdev`.
    pub stdev: f64,
}

/// Summary statistics for one batch of samples.
///
/// `latency` and `throughput` are present only when at least one sample
/// succeeded; otherwise only the counts and the [`NO_SUCCESSES`] marker are
/// reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyStats>,
    /// Successes divided by the sum of successful durations (ops/s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// Reduce a batch of samples to [`AggregateStats`].
pub fn aggregate(samples: &[Sample]) -> AggregateStats {
    let total = samples.len();
    let mut durations: Vec<f64> = samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.duration.as_secs_f64())
        .collect();
    let successes = durations.len();
    let failures = total - successes;

    if successes == 0 {
        return AggregateStats {
            total,
            successes,
            failures,
            success_rate: 0.0,
            latency: None,
            throughput: None,
            error: Some(NO_SUCCESSES),
        };
    }

    durations.sort_by(|a, b| a.total_cmp(b));
    let sum: f64 = durations.iter().sum();
    let mean = sum / successes as f64;

    let median = if successes % 2 == 1 {
        durations[successes / 2]
    } else {
        (durations[successes / 2 - 1] + durations[successes / 2]) / 2.0
    };

    let stdev = if successes < 2 {
        0.0
    } else {
        let var = durations
            .iter()
            .map(|d| (d - mean).powi(2))
            .sum::<f64>()
            / (successes - 1) as f64;
        var.sqrt()
    };

    let throughput = if sum > 0.0 { successes as f64 / sum } else { 0.0 };

    AggregateStats {
        total,
        successes,
        failures,
        success_rate: successes as f64 / total as f64,
        latency: Some(LatencyStats {
            min: durations[0],
            max: durations[successes - 1],
            mean,
            median,
            stdev,
        }),
        throughput: Some(throughput),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ok(secs: f64) -> Sample {
        Sample::success("q", Duration::from_secs_f64(secs), 1)
    }

    fn failed() -> Sample {
        Sample::failure("q", Duration::from_millis(1), "down")
    }

    #[test]
    fn empty_batch_reports_counts_only() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.latency.is_none());
        assert!(stats.throughput.is_none());
        assert_eq!(stats.error, Some(NO_SUCCESSES));
    }

    #[test]
    fn all_failures_reports_marker_without_latency() {
        let stats = aggregate(&[failed(), failed(), failed()]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.failures, 3);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.latency.is_none());
        assert_eq!(stats.error, Some(NO_SUCCESSES));
    }

    #[test]
    fn latency_bounds_hold() {
        let stats = aggregate(&[ok(0.03), ok(0.01), ok(0.05), failed()]);
        let lat = stats.latency.unwrap();
        assert!(lat.min <= lat.median && lat.median <= lat.max);
        assert!(lat.mean >= lat.min && lat.mean <= lat.max);
        assert_eq!(stats.successes, 3);
        assert_eq!(stats.failures, 1);
        assert!((stats.success_rate - 0.75).abs() < 1e-12);
    }

    #[test]
    fn single_success_has_zero_stdev() {
        let stats = aggregate(&[ok(0.02)]);
        let lat = stats.latency.unwrap();
        assert_eq!(lat.stdev, 0.0);
        assert_eq!(lat.min, lat.max);
        assert_eq!(lat.median, 0.02);
    }

    #[test]
    fn even_count_median_averages_the_middle_pair() {
        let stats = aggregate(&[ok(0.01), ok(0.02), ok(0.04), ok(0.08)]);
        let lat = stats.latency.unwrap();
        assert!((lat.median - 0.03).abs() < 1e-12);
    }

    #[test]
    fn order_independent() {
        let mut samples = vec![ok(0.05), failed(), ok(0.01), ok(0.03), ok(0.02)];
        let forward = aggregate(&samples);
        samples.reverse();
        let backward = aggregate(&samples);
        assert_eq!(forward, backward);
    }

    #[test]
    fn throughput_is_successes_over_total_successful_time() {
        // 25 samples like a full 5-query × 5-repeat battery.
        let samples: Vec<Sample> = (0..25)
            .map(|i| ok(0.01 + (i as f64) * (0.04 / 24.0)))
            .collect();
        let sum: f64 = samples.iter().map(|s| s.duration.as_secs_f64()).sum();

        let stats = aggregate(&samples);
        assert_eq!(stats.total, 25);
        assert_eq!(stats.success_rate, 1.0);
        let qps = stats.throughput.unwrap();
        assert!((qps - 25.0 / sum).abs() < 1e-9);
    }
}
