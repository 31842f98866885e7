//! Request latency telemetry.
//!
//! Successful call latencies are grouped by endpoint and reported back to the
//! service as `l_<endpoint>` query parameters holding the average latency in
//! seconds over the last minute.

use dashmap::DashMap;
use pulse_protocol::OperationType;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// How long a latency sample counts towards the average.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Sample {
    recorded_at: Instant,
    latency: Duration,
}

/// Latency collector shared by every call of a client.
#[derive(Debug)]
pub struct TelemetryManager {
    samples: DashMap<&'static str, Vec<Sample>>,
    max_age: Duration,
}

impl TelemetryManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_age(DEFAULT_MAX_AGE)
    }

    #[must_use]
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            samples: DashMap::new(),
            max_age,
        }
    }

    /// Record the latency of a successful call.
    ///
    /// Kinds without a telemetry endpoint are ignored.
    pub fn store_latency(&self, operation: OperationType, latency: Duration) {
        let Some(endpoint) = operation.telemetry_endpoint() else {
            return;
        };
        trace!(endpoint, latency_ms = latency.as_millis() as u64, "Storing latency");
        self.samples.entry(endpoint).or_default().push(Sample {
            recorded_at: Instant::now(),
            latency,
        });
    }

    /// Average latency per endpoint as `l_<endpoint>` query parameters.
    ///
    /// Samples older than the maximum age are evicted first; endpoints left
    /// without samples are omitted.
    #[must_use]
    pub fn operation_latency(&self) -> HashMap<String, String> {
        let now = Instant::now();
        let mut result = HashMap::new();

        for mut entry in self.samples.iter_mut() {
            entry
                .value_mut()
                .retain(|s| now.duration_since(s.recorded_at) < self.max_age);

            let samples = entry.value();
            if samples.is_empty() {
                continue;
            }
            let total: f64 = samples.iter().map(|s| s.latency.as_secs_f64()).sum();
            let average = total / samples.len() as f64;
            result.insert(format!("l_{}", entry.key()), format!("{:.3}", average));
        }

        result
    }
}

impl Default for TelemetryManager {
    fn default() -> Self {
        Self::new()
    }
}
