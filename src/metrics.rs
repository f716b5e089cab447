//! Counter harvesting for the log-pipeline subsystem.
//!
//! [`MetricsScraper`] pulls a Prometheus-style text exposition from an
//! endpoint's `/metrics` path and parses it into a [`MetricsSnapshot`];
//! [`counter_rate`] differences two snapshots over a known window to infer
//! a per-second rate for a monotonic counter.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A parsed exposition value: numeric when the text parses as a float,
/// otherwise kept verbatim. A malformed value never aborts a scrape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// Point-in-time capture of an endpoint's exposed counters.
///
/// On scrape failure the value mapping is empty and `error` describes the
/// cause; the scraper never raises to its caller. Two snapshots are
/// comparable only if they come from the same endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    #[serde(skip)]
    pub endpoint: String,
    #[serde(skip)]
    pub captured_at: DateTime<Utc>,
    pub values: BTreeMap<String, MetricValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricsSnapshot {
    fn failed(endpoint: &str, error: String) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            captured_at: Utc::now(),
            values: BTreeMap::new(),
            error: Some(error),
        }
    }

    /// Numeric value of a metric, reading missing or textual values as 0.
    pub fn numeric(&self, name: &str) -> f64 {
        match self.values.get(name) {
            Some(MetricValue::Number(n)) => *n,
            _ => 0.0,
        }
    }
}

/// Parse exposition text: comment and blank lines are dropped, everything
/// else splits into name and value on the first whitespace.
pub fn parse_exposition(body: &str) -> BTreeMap<String, MetricValue> {
    let mut values = BTreeMap::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let value = value.trim();
        let parsed = match value.parse::<f64>() {
            Ok(n) => MetricValue::Number(n),
            Err(_) => MetricValue::Text(value.to_string()),
        };
        values.insert(name.to_string(), parsed);
    }
    values
}

/// Default per-scrape timeout.
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP scraper for `/metrics` endpoints.
#[derive(Debug, Clone)]
pub struct MetricsScraper {
    client: reqwest::Client,
}

impl Default for MetricsScraper {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_SCRAPE_TIMEOUT)
    }
}

impl MetricsScraper {
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// GET `{base_url}/metrics` and parse the body.
    ///
    /// Non-200 responses and transport failures come back as error-marked
    /// empty snapshots, never as an `Err`.
    pub async fn scrape(&self, base_url: &str) -> MetricsSnapshot {
        let url = format!("{}/metrics", base_url.trim_end_matches('/'));
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(endpoint = base_url, error = %e, "metrics scrape failed");
                return MetricsSnapshot::failed(base_url, e.to_string());
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            return MetricsSnapshot::failed(base_url, format!("HTTP {}", response.status().as_u16()));
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return MetricsSnapshot::failed(base_url, e.to_string()),
        };

        MetricsSnapshot {
            endpoint: base_url.to_string(),
            captured_at: Utc::now(),
            values: parse_exposition(&body),
            error: None,
        }
    }
}

/// Per-second rate of a monotonic counter over a measured window, or
/// `Indeterminate` when the window cannot support a meaningful figure
/// (counter reset, zero window, mismatched endpoints).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CounterRate {
    PerSecond(f64),
    Indeterminate,
}

impl Serialize for CounterRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CounterRate::PerSecond(rate) => serializer.serialize_f64(*rate),
            CounterRate::Indeterminate => serializer.serialize_str("indeterminate"),
        }
    }
}

/// Difference a named counter across two snapshots taken `window` apart.
///
/// The window is supplied by the caller, not inferred from snapshot
/// timestamps, because the caller controls the wait between captures.
/// Missing keys read as 0 in both snapshots.
pub fn counter_rate(
    initial: &MetricsSnapshot,
    last: &MetricsSnapshot,
    window: Duration,
    counter: &str,
) -> CounterRate {
    if initial.endpoint != last.endpoint {
        tracing::warn!(
            initial = %initial.endpoint,
            last = %last.endpoint,
            "rate window across different endpoints"
        );
        return CounterRate::Indeterminate;
    }
    let secs = window.as_secs_f64();
    if secs <= 0.0 {
        return CounterRate::Indeterminate;
    }

    let before = initial.numeric(counter);
    let after = last.numeric(counter);
    if after < before {
        // Monotonic counters are assumed never to reset inside the window.
        return CounterRate::Indeterminate;
    }
    CounterRate::PerSecond((after - before) / secs)
}
