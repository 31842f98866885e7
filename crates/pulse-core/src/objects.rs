//! Object-model and message-action events.
//!
//! Object events share one envelope:
//! `{"source": "objects", "event": "update", "type": "user", "data": {...}}`,
//! and `type` selects the user, space or membership kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Object-model entity an objects payload refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    User,
    Space,
    Membership,
}

impl ObjectKind {
    /// Read the `type` field of an objects payload.
    #[must_use]
    pub fn of(payload: &Value) -> Option<Self> {
        match payload.get("type").and_then(Value::as_str)? {
            "user" => Some(ObjectKind::User),
            "space" => Some(ObjectKind::Space),
            "membership" => Some(ObjectKind::Membership),
            _ => None,
        }
    }
}

/// A user object was created, updated or deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    /// `create`, `update` or `delete`.
    pub event: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub external_id: String,
    pub profile_url: String,
    pub custom: Option<Value>,
    pub updated: String,
    pub etag: String,
    pub channel: String,
    pub subscription: Option<String>,
    pub timetoken: i64,
}

impl UserEvent {
    #[must_use]
    pub fn from_payload(channel: impl Into<String>, payload: &Value) -> Self {
        let data = payload.get("data").unwrap_or(&Value::Null);
        Self {
            event: text(payload, "event"),
            user_id: text(data, "id"),
            name: text(data, "name"),
            email: text(data, "email"),
            external_id: text(data, "externalId"),
            profile_url: text(data, "profileUrl"),
            custom: data.get("custom").cloned(),
            updated: text(data, "updated"),
            etag: text(data, "eTag"),
            channel: channel.into(),
            subscription: None,
            timetoken: 0,
        }
    }
}

/// A space object was created, updated or deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceEvent {
    pub event: String,
    pub space_id: String,
    pub name: String,
    pub description: String,
    pub custom: Option<Value>,
    pub updated: String,
    pub etag: String,
    pub channel: String,
    pub subscription: Option<String>,
    pub timetoken: i64,
}

impl SpaceEvent {
    #[must_use]
    pub fn from_payload(channel: impl Into<String>, payload: &Value) -> Self {
        let data = payload.get("data").unwrap_or(&Value::Null);
        Self {
            event: text(payload, "event"),
            space_id: text(data, "id"),
            name: text(data, "name"),
            description: text(data, "description"),
            custom: data.get("custom").cloned(),
            updated: text(data, "updated"),
            etag: text(data, "eTag"),
            channel: channel.into(),
            subscription: None,
            timetoken: 0,
        }
    }
}

/// A user joined, left or updated a space membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub event: String,
    pub user_id: String,
    pub space_id: String,
    pub custom: Option<Value>,
    pub channel: String,
    pub subscription: Option<String>,
    pub timetoken: i64,
}

impl MembershipEvent {
    #[must_use]
    pub fn from_payload(channel: impl Into<String>, payload: &Value) -> Self {
        let data = payload.get("data").unwrap_or(&Value::Null);
        Self {
            event: text(payload, "event"),
            user_id: text(data, "userId"),
            space_id: text(data, "spaceId"),
            custom: data.get("custom").cloned(),
            channel: channel.into(),
            subscription: None,
            timetoken: 0,
        }
    }
}

/// A reaction or other action was added to or removed from a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageActionEvent {
    /// `added` or `removed`.
    pub event: String,
    pub action_type: String,
    pub action_value: String,
    /// Timetoken of the message the action applies to.
    pub message_timetoken: String,
    pub action_timetoken: String,
    /// Device that added or removed the action.
    pub uuid: String,
    pub channel: String,
    pub subscription: Option<String>,
    pub timetoken: i64,
}

impl MessageActionEvent {
    #[must_use]
    pub fn from_payload(channel: impl Into<String>, payload: &Value) -> Self {
        let data = payload.get("data").unwrap_or(&Value::Null);
        Self {
            event: text(payload, "event"),
            action_type: text(data, "type"),
            action_value: text(data, "value"),
            message_timetoken: text(data, "messageTimetoken"),
            action_timetoken: text(data, "actionTimetoken"),
            uuid: text(data, "uuid"),
            channel: channel.into(),
            subscription: None,
            timetoken: 0,
        }
    }
}
