//! Publish, signal and time response decoders.
//!
//! These endpoints answer with JSON arrays rather than objects:
//! `[1, "Sent", "15000000000000000"]` for a publish and `[15000000000000000]`
//! for the time endpoint.

use crate::response::{parse_array, timetoken, DecodeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a publish, fire or signal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// Server timetoken assigned to the message.
    pub timetoken: i64,
}

/// Decode a publish or signal response.
///
/// # Errors
///
/// Returns [`DecodeError::ServerReported`] when the status element is `0`,
/// or a shape error when the array is incomplete.
pub fn decode_publish(payload: &[u8]) -> Result<PublishResult, DecodeError> {
    let items = parse_array(payload)?;

    match items.first().and_then(Value::as_i64) {
        Some(1) => {}
        Some(_) => {
            let message = items
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or("Publish failed")
                .to_string();
            return Err(DecodeError::ServerReported { message });
        }
        None => {
            return Err(DecodeError::Shape {
                response: "publish",
                step: "status element missing",
            })
        }
    }

    match items.get(2).and_then(timetoken) {
        Some(timetoken) => Ok(PublishResult { timetoken }),
        None => Err(DecodeError::Shape {
            response: "publish",
            step: "timetoken element missing",
        }),
    }
}

/// Decode a time response.
///
/// # Errors
///
/// Returns an error if the array does not start with a timetoken.
pub fn decode_time(payload: &[u8]) -> Result<i64, DecodeError> {
    parse_array(payload)?
        .first()
        .and_then(timetoken)
        .ok_or(DecodeError::Shape {
            response: "time",
            step: "timetoken element missing",
        })
}
