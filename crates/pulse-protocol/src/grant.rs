//! Access-manager grant response decoder.
//!
//! A grant covering one channel echoes it inline (`payload.channel` with the
//! permission flags next to it); a grant covering several uses a
//! `payload.channels` map. Channel groups follow the same pattern under
//! `channel-group` / `channel-groups`.

use crate::response::{parse_object, recognize, DecodeError, JsonObject, Recognition, Shape};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Read / write / manage / delete flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub manage: bool,
    pub delete: bool,
}

impl Permissions {
    fn from_object(object: &JsonObject) -> Self {
        let flag = |key: &str| object.get(key).and_then(Value::as_i64) == Some(1);
        Self {
            read: flag("r"),
            write: flag("w"),
            manage: flag("m"),
            delete: flag("d"),
        }
    }
}

/// Permissions granted on one channel or channel group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrantEntry {
    /// Entity-level permissions.
    pub permissions: Permissions,
    /// Per auth key permissions.
    pub auth_keys: HashMap<String, Permissions>,
    /// Entity-level TTL override, in minutes.
    pub ttl: Option<i64>,
}

impl GrantEntry {
    fn from_object(object: &JsonObject) -> Self {
        let auth_keys = object
            .get("auths")
            .and_then(Value::as_object)
            .map(|auths| {
                auths
                    .iter()
                    .filter_map(|(key, perms)| {
                        perms
                            .as_object()
                            .map(|p| (key.clone(), Permissions::from_object(p)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            permissions: Permissions::from_object(object),
            auth_keys,
            ttl: object.get("ttl").and_then(Value::as_i64),
        }
    }
}

/// Decoded grant response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrantResult {
    /// Grant level (`subkey`, `channel`, `channel-group`, `user`).
    pub level: String,
    pub subscribe_key: String,
    /// TTL in minutes.
    pub ttl: i64,
    pub channels: HashMap<String, GrantEntry>,
    pub channel_groups: HashMap<String, GrantEntry>,
}

type Entries = HashMap<String, GrantEntry>;

/// Decode a grant response.
///
/// # Errors
///
/// Returns an error if the payload is malformed, reports an error, or a
/// recognized shape is incomplete.
pub fn decode_grant(payload: &[u8]) -> Result<GrantResult, DecodeError> {
    let object = parse_object(payload)?;
    let Some(body) = object.get("payload").and_then(Value::as_object) else {
        return Err(DecodeError::Shape {
            response: "grant",
            step: "payload missing or not an object",
        });
    };

    let channels = recognize(
        "grant",
        body,
        &[
            Shape::new("single-channel", |b| single_entity(b, "channel")),
            Shape::new("aggregate-channels", |b| aggregate_entities(b, "channels")),
            Shape::new("no-channels", |_| Recognition::Matched(Entries::new())),
        ],
    )?;
    let channel_groups = recognize(
        "grant",
        body,
        &[
            Shape::new("single-group", |b| single_entity(b, "channel-group")),
            Shape::new("aggregate-groups", |b| {
                aggregate_entities(b, "channel-groups")
            }),
            Shape::new("no-groups", |_| Recognition::Matched(Entries::new())),
        ],
    )?;

    Ok(GrantResult {
        level: body
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        subscribe_key: body
            .get("subscribe_key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        ttl: body.get("ttl").and_then(Value::as_i64).unwrap_or_default(),
        channels,
        channel_groups,
    })
}

fn single_entity(body: &JsonObject, key: &str) -> Recognition<Entries> {
    match body.get(key) {
        None => Recognition::NotApplicable,
        Some(Value::String(name)) => {
            Recognition::Matched(HashMap::from([(name.clone(), GrantEntry::from_object(body))]))
        }
        Some(_) => Recognition::Malformed("single form: entity name is not a string"),
    }
}

fn aggregate_entities(body: &JsonObject, key: &str) -> Recognition<Entries> {
    match body.get(key) {
        None => Recognition::NotApplicable,
        // Older services answer a single group grant with the name as a string.
        Some(Value::String(name)) => {
            Recognition::Matched(HashMap::from([(name.clone(), GrantEntry::from_object(body))]))
        }
        Some(Value::Object(entries)) => {
            let mut result = Entries::with_capacity(entries.len());
            for (name, entry) in entries {
                let Some(entry) = entry.as_object() else {
                    return Recognition::Malformed("aggregate form: entry is not an object");
                };
                result.insert(name.clone(), GrantEntry::from_object(entry));
            }
            Recognition::Matched(result)
        }
        Some(_) => Recognition::Malformed("aggregate form: entities is not an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_channel() {
        let payload = br#"{"message":"Success","payload":{"level":"channel",
            "subscribe_key":"sub","ttl":1440,"channel":"ch",
            "auths":{"key1":{"r":1,"w":1,"m":0,"d":0}}},
            "service":"Access Manager","status":200}"#;
        let grant = decode_grant(payload).unwrap();

        assert_eq!(grant.level, "channel");
        assert_eq!(grant.ttl, 1440);
        let entry = &grant.channels["ch"];
        assert!(entry.auth_keys["key1"].read);
        assert!(entry.auth_keys["key1"].write);
        assert!(!entry.auth_keys["key1"].manage);
        assert!(grant.channel_groups.is_empty());
    }

    #[test]
    fn test_aggregate_channels_and_groups() {
        let payload = br#"{"status":200,"payload":{"level":"channel","subscribe_key":"sub",
            "ttl":5,"channels":{"a":{"r":1,"w":0},"b":{"r":0,"w":1,"ttl":10}},
            "channel-groups":{"g":{"m":1}}}}"#;
        let grant = decode_grant(payload).unwrap();

        assert_eq!(grant.channels.len(), 2);
        assert!(grant.channels["a"].permissions.read);
        assert!(grant.channels["b"].permissions.write);
        assert_eq!(grant.channels["b"].ttl, Some(10));
        assert!(grant.channel_groups["g"].permissions.manage);
    }

    #[test]
    fn test_group_name_as_string() {
        let payload = br#"{"payload":{"level":"channel-group","channel-groups":"g","r":1}}"#;
        let grant = decode_grant(payload).unwrap();
        assert!(grant.channel_groups["g"].permissions.read);
    }

    #[test]
    fn test_missing_payload() {
        assert!(matches!(
            decode_grant(br#"{"status":200}"#),
            Err(DecodeError::Shape { .. })
        ));
        assert!(matches!(
            decode_grant(br#"{"payload":{"channels":[1]}}"#),
            Err(DecodeError::Shape { .. })
        ));
    }

    #[test]
    fn test_forbidden() {
        match decode_grant(br#"{"error":true,"message":"Forbidden","status":403}"#) {
            Err(DecodeError::ServerReported { message }) => assert_eq!(message, "Forbidden"),
            other => panic!("Expected ServerReported error, got {:?}", other),
        }
    }
}
