//! Message and signal events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message or signal received on a subscribed channel.
///
/// Signals use the same shape; they are delivered on the listener's signal
/// channel instead of its message channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Decoded payload.
    pub message: Value,
    /// Metadata the publisher attached.
    pub user_metadata: Option<Value>,
    /// Channel the message was published to.
    pub channel: String,
    /// Subscription (channel group or wildcard) that matched, if not the
    /// channel itself.
    pub subscription: Option<String>,
    /// Publisher uuid.
    pub publisher: Option<String>,
    /// Server timetoken.
    pub timetoken: i64,
}

impl MessageEvent {
    /// Create a message event on `channel`.
    #[must_use]
    pub fn new(channel: impl Into<String>, message: Value) -> Self {
        Self {
            message,
            user_metadata: None,
            channel: channel.into(),
            subscription: None,
            publisher: None,
            timetoken: 0,
        }
    }

    #[must_use]
    pub fn with_timetoken(mut self, timetoken: i64) -> Self {
        self.timetoken = timetoken;
        self
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }
}
