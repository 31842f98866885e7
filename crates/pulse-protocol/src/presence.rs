//! Presence response decoders.
//!
//! State lookups and here-now queries are answered in an inline form when a
//! single channel was requested and in an aggregate form otherwise. Both forms
//! are part of the protocol and must be accepted.

use crate::response::{parse_object, recognize, DecodeError, JsonObject, Recognition, Shape};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Per-channel presence state keyed by channel name.
pub type ChannelStates = HashMap<String, Value>;

/// Decode a get-state response.
///
/// Accepted shapes:
///
/// - inline: `{"channel": "c1", "payload": {...}}`
/// - aggregate: `{"payload": {"channels": {"c1": {...}, "c2": {...}}}}`
///
/// # Errors
///
/// Returns an error naming the failed recognition step when neither shape
/// applies cleanly, or the server message when the payload is an error.
pub fn decode_state(payload: &[u8]) -> Result<ChannelStates, DecodeError> {
    let object = parse_object(payload)?;
    recognize(
        "get-state",
        &object,
        &[
            Shape::new("inline-channel", inline_state),
            Shape::new("aggregate-channels", aggregate_state),
        ],
    )
}

fn inline_state(object: &JsonObject) -> Recognition<ChannelStates> {
    let Some(channel) = object.get("channel") else {
        return Recognition::NotApplicable;
    };
    let Some(channel) = channel.as_str() else {
        return Recognition::Malformed("inline form: channel is not a string");
    };
    match object.get("payload") {
        Some(value) if !value.is_null() => {
            Recognition::Matched(HashMap::from([(channel.to_string(), value.clone())]))
        }
        _ => Recognition::Malformed("inline form: payload missing"),
    }
}

fn aggregate_state(object: &JsonObject) -> Recognition<ChannelStates> {
    let Some(payload) = object.get("payload") else {
        return Recognition::NotApplicable;
    };
    let Some(payload) = payload.as_object() else {
        return Recognition::Malformed("aggregate form: payload is not an object");
    };
    match payload.get("channels").and_then(Value::as_object) {
        Some(channels) => Recognition::Matched(
            channels
                .iter()
                .map(|(channel, state)| (channel.clone(), state.clone()))
                .collect(),
        ),
        None => Recognition::Malformed("aggregate form: channels missing or not an object"),
    }
}

/// Decode a set-state response, returning the state the service stored.
///
/// # Errors
///
/// Returns an error if the payload is malformed or reports an error.
pub fn decode_set_state(payload: &[u8]) -> Result<Value, DecodeError> {
    let object = parse_object(payload)?;
    match object.get("payload") {
        Some(state) => Ok(state.clone()),
        None => Err(DecodeError::Shape {
            response: "set-state",
            step: "payload missing",
        }),
    }
}

/// Decode a leave response.
///
/// # Errors
///
/// Returns an error if the payload is malformed or reports an error.
pub fn decode_leave(payload: &[u8]) -> Result<(), DecodeError> {
    parse_object(payload).map(|_| ())
}

/// One occupant of a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occupant {
    /// Occupant's device identifier.
    pub uuid: String,
    /// Occupant's state, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

/// Occupancy of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelOccupancy {
    /// Channel name.
    pub channel: String,
    /// Number of occupants.
    pub occupancy: usize,
    /// Occupants, empty when uuids were not requested.
    pub occupants: Vec<Occupant>,
}

/// Decoded here-now response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HereNow {
    /// Number of channels reported.
    pub total_channels: usize,
    /// Sum of occupancy across channels.
    pub total_occupancy: usize,
    /// Channels sorted by name.
    pub channels: Vec<ChannelOccupancy>,
}

/// Decode a here-now response.
///
/// `requested` are the channels of the request; the single-channel form
/// does not echo the channel name.
///
/// # Errors
///
/// Returns an error naming the failed recognition step when neither shape
/// applies cleanly.
pub fn decode_here_now(payload: &[u8], requested: &[String]) -> Result<HereNow, DecodeError> {
    let object = parse_object(payload)?;
    recognize(
        "here-now",
        &object,
        &[
            Shape::new("single-channel", |obj| single_here_now(obj, requested)),
            Shape::new("aggregate-channels", aggregate_here_now),
        ],
    )
}

fn single_here_now(object: &JsonObject, requested: &[String]) -> Recognition<HereNow> {
    let Some(occupancy) = object.get("occupancy") else {
        return Recognition::NotApplicable;
    };
    let Some(occupancy) = occupancy.as_u64() else {
        return Recognition::Malformed("single-channel form: occupancy is not a number");
    };
    let [channel] = requested else {
        return Recognition::Malformed("single-channel form: request named more than one channel");
    };
    let occupants = match object.get("uuids") {
        None => Vec::new(),
        Some(uuids) => match occupants(uuids) {
            Some(list) => list,
            None => return Recognition::Malformed("single-channel form: uuids is not a list"),
        },
    };

    let occupancy = occupancy as usize;
    Recognition::Matched(HereNow {
        total_channels: 1,
        total_occupancy: occupancy,
        channels: vec![ChannelOccupancy {
            channel: channel.clone(),
            occupancy,
            occupants,
        }],
    })
}

fn aggregate_here_now(object: &JsonObject) -> Recognition<HereNow> {
    let Some(payload) = object.get("payload") else {
        return Recognition::NotApplicable;
    };
    let Some(payload) = payload.as_object() else {
        return Recognition::Malformed("aggregate form: payload is not an object");
    };

    let mut channels = Vec::new();
    if let Some(entries) = payload.get("channels") {
        let Some(entries) = entries.as_object() else {
            return Recognition::Malformed("aggregate form: channels is not an object");
        };
        for (name, entry) in entries {
            let occupancy = entry.get("occupancy").and_then(Value::as_u64).unwrap_or(0);
            let list = match entry.get("uuids") {
                None => Vec::new(),
                Some(uuids) => match occupants(uuids) {
                    Some(list) => list,
                    None => return Recognition::Malformed("aggregate form: uuids is not a list"),
                },
            };
            channels.push(ChannelOccupancy {
                channel: name.clone(),
                occupancy: occupancy as usize,
                occupants: list,
            });
        }
    }
    channels.sort_by(|a, b| a.channel.cmp(&b.channel));

    let total_occupancy = payload
        .get("total_occupancy")
        .and_then(Value::as_u64)
        .map_or_else(|| channels.iter().map(|c| c.occupancy).sum(), |n| n as usize);
    let total_channels = payload
        .get("total_channels")
        .and_then(Value::as_u64)
        .map_or(channels.len(), |n| n as usize);

    Recognition::Matched(HereNow {
        total_channels,
        total_occupancy,
        channels,
    })
}

/// Occupant entries are either bare uuids or `{"uuid": .., "state": ..}`.
fn occupants(uuids: &Value) -> Option<Vec<Occupant>> {
    let list = uuids.as_array()?;
    let mut result = Vec::with_capacity(list.len());
    for entry in list {
        match entry {
            Value::String(uuid) => result.push(Occupant {
                uuid: uuid.clone(),
                state: None,
            }),
            Value::Object(obj) => result.push(Occupant {
                uuid: obj.get("uuid")?.as_str()?.to_string(),
                state: obj.get("state").cloned(),
            }),
            _ => return None,
        }
    }
    Some(result)
}
