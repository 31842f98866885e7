//! Presence events.
//!
//! Presence notifications arrive on `<channel>-pnpres` and describe joins,
//! leaves, timeouts, state changes and periodic interval summaries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A presence notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// `join`, `leave`, `timeout`, `state-change` or `interval`.
    pub event: String,
    /// Device the event is about, empty for interval events.
    pub uuid: String,
    /// Channel without the presence suffix.
    pub channel: String,
    pub subscription: Option<String>,
    /// Channel occupancy after the event.
    pub occupancy: usize,
    pub timetoken: i64,
    /// Server-side Unix timestamp, seconds.
    pub timestamp: i64,
    pub state: Option<Value>,
    /// Interval events: devices that joined since the last interval.
    pub join: Vec<String>,
    /// Interval events: devices that left.
    pub leave: Vec<String>,
    /// Interval events: devices that timed out.
    pub timeout: Vec<String>,
    /// Interval events: the delta was too large and a here-now call is due.
    pub here_now_refresh: bool,
}

impl PresenceEvent {
    /// Build an event from a presence payload.
    ///
    /// Missing fields are left at their defaults.
    #[must_use]
    pub fn from_payload(channel: impl Into<String>, payload: &Value) -> Self {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let list = |key: &str| -> Vec<String> {
            payload
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            event: text("action"),
            uuid: text("uuid"),
            channel: channel.into(),
            subscription: None,
            occupancy: payload
                .get("occupancy")
                .and_then(Value::as_u64)
                .unwrap_or_default() as usize,
            timetoken: 0,
            timestamp: payload
                .get("timestamp")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            state: payload.get("data").cloned(),
            join: list("join"),
            leave: list("leave"),
            timeout: list("timeout"),
            here_now_refresh: payload
                .get("here_now_refresh")
                .and_then(Value::as_bool)
                .unwrap_or_default(),
        }
    }
}
