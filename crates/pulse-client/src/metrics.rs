//! Metrics collection and export for the Pulse client.
//!
//! Uses the `metrics` crate for instrumentation. Nothing is recorded unless
//! the application installs a recorder; the `pulse` binary can export to
//! Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "pulse_requests_total";
    pub const REQUEST_LATENCY_SECONDS: &str = "pulse_request_latency_seconds";
    pub const SUBSCRIBE_MESSAGES_TOTAL: &str = "pulse_subscribe_messages_total";
    pub const LISTENERS_ACTIVE: &str = "pulse_listeners_active";
}

/// Describe every metric the client records.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::REQUESTS_TOTAL,
        "Total number of API calls by operation and outcome"
    );
    metrics::describe_histogram!(
        names::REQUEST_LATENCY_SECONDS,
        "API call latency in seconds"
    );
    metrics::describe_counter!(
        names::SUBSCRIBE_MESSAGES_TOTAL,
        "Total number of events received from subscribe long-polls"
    );
    metrics::describe_gauge!(names::LISTENERS_ACTIVE, "Current number of registered listeners");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics endpoint.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record the outcome of an API call.
pub fn record_request(operation: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!(names::REQUESTS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
    histogram!(names::REQUEST_LATENCY_SECONDS, "operation" => operation)
        .record(elapsed.as_secs_f64());
}

/// Record events received from one long-poll.
pub fn record_subscribe_messages(count: usize) {
    counter!(names::SUBSCRIBE_MESSAGES_TOTAL).increment(count as u64);
}

/// Update the registered listener count.
pub fn set_active_listeners(count: usize) {
    gauge!(names::LISTENERS_ACTIVE).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: every call is a no-op.
        init_metrics();
        record_request("time", "acknowledgment", Duration::from_millis(5));
        record_subscribe_messages(3);
        set_active_listeners(1);
    }
}
