//! Subscribe long-poll envelope.
//!
//! ```json
//! {"t": {"t": "15000000000000000", "r": 12},
//!  "m": [{"a": "1", "f": 0, "e": 1, "i": "publisher", "p": {"t": "...", "r": 12},
//!         "k": "sub-key", "c": "channel", "d": {...}, "u": {...}, "b": "subscription"}]}
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::response::DecodeError;

/// Suffix the service appends to presence channels.
pub const PRESENCE_SUFFIX: &str = "-pnpres";

/// Cursor into the subscribe stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Timetoken.
    #[serde(rename = "t", deserialize_with = "string_or_number")]
    pub timetoken: i64,
    /// Region.
    #[serde(rename = "r", default)]
    pub region: i32,
}

/// Kind tag carried in the `e` field of a subscribe message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Message,
    Signal,
    Objects,
    MessageAction,
}

impl MessageType {
    fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => MessageType::Signal,
            Some(2) => MessageType::Objects,
            Some(3) => MessageType::MessageAction,
            _ => MessageType::Message,
        }
    }
}

/// One message in a subscribe envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeMessage {
    #[serde(rename = "a", default)]
    pub shard: Option<String>,
    #[serde(rename = "f", default)]
    pub flags: i64,
    #[serde(rename = "e", default)]
    pub message_type: Option<i64>,
    /// Publisher uuid.
    #[serde(rename = "i", default)]
    pub issuing_client: Option<String>,
    #[serde(rename = "k", default)]
    pub subscribe_key: String,
    #[serde(rename = "c")]
    pub channel: String,
    /// Channel or wildcard pattern that matched, when it differs from `c`.
    #[serde(rename = "b", default)]
    pub subscription_match: Option<String>,
    #[serde(rename = "d", default)]
    pub payload: Value,
    #[serde(rename = "u", default)]
    pub user_metadata: Option<Value>,
    /// Publish cursor.
    #[serde(rename = "p", default)]
    pub publish_cursor: Option<Cursor>,
}

impl SubscribeMessage {
    /// Kind of this message.
    #[must_use]
    pub fn kind(&self) -> MessageType {
        MessageType::from_code(self.message_type)
    }

    /// Whether the message arrived on a presence channel.
    #[must_use]
    pub fn is_presence(&self) -> bool {
        self.channel.ends_with(PRESENCE_SUFFIX)
    }

    /// Channel name without the presence suffix.
    #[must_use]
    pub fn base_channel(&self) -> &str {
        self.channel
            .strip_suffix(PRESENCE_SUFFIX)
            .unwrap_or(&self.channel)
    }

    /// Subscription that matched, without the presence suffix.
    #[must_use]
    pub fn subscription(&self) -> Option<&str> {
        self.subscription_match
            .as_deref()
            .filter(|s| *s != self.channel)
            .map(|s| s.strip_suffix(PRESENCE_SUFFIX).unwrap_or(s))
    }

    /// Publish timetoken, zero when absent.
    #[must_use]
    pub fn timetoken(&self) -> i64 {
        self.publish_cursor.map_or(0, |c| c.timetoken)
    }
}

/// A subscribe long-poll response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeEnvelope {
    #[serde(rename = "t")]
    pub cursor: Cursor,
    #[serde(rename = "m", default)]
    pub messages: Vec<SubscribeMessage>,
}

impl SubscribeEnvelope {
    /// Decode an envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid envelope or carries
    /// a server error.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(payload)?;
        if let Some(message) = value.as_object().and_then(crate::response::server_error) {
            return Err(DecodeError::ServerReported { message });
        }
        if !value.is_object() {
            return Err(DecodeError::UnexpectedType { expected: "object" });
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
