//! Response decoding primitives.
//!
//! The service does not always answer logically equivalent requests with the
//! same JSON shape. Decoders therefore run an ordered chain of [`Shape`]
//! recognizers over the parsed object. Each recognizer is total: it either
//! matches, declares itself not applicable (its discriminating field is
//! absent), or reports which step of the recognition failed.

use serde_json::{Map, Value};
use thiserror::Error;

/// A decoded JSON object.
pub type JsonObject = Map<String, Value>;

/// Errors produced while decoding a response payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON value has the wrong type.
    #[error("Unexpected response: expected {expected}")]
    UnexpectedType {
        /// Expected top-level type.
        expected: &'static str,
    },

    /// A recognizer matched the response but a required field was wrong.
    #[error("Unrecognized {response} response: {step}")]
    Shape {
        /// Response being decoded.
        response: &'static str,
        /// The recognition step that failed.
        step: &'static str,
    },

    /// No recognizer applied to the response.
    #[error("No recognized {response} response shape (tried: {tried})")]
    NoMatchingShape {
        /// Response being decoded.
        response: &'static str,
        /// Names of the shapes that were attempted, in order.
        tried: String,
    },

    /// The payload carried an explicit error from the service.
    #[error("Server reported error: {message}")]
    ServerReported {
        /// Server-supplied message.
        message: String,
    },
}

/// Outcome of running one recognizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition<T> {
    /// The response has this shape.
    Matched(T),
    /// The discriminating field of this shape is absent.
    NotApplicable,
    /// The shape applies but the named step failed.
    Malformed(&'static str),
}

/// A named response shape recognizer.
pub struct Shape<'a, T> {
    name: &'static str,
    recognize: Box<dyn Fn(&JsonObject) -> Recognition<T> + 'a>,
}

impl<'a, T> Shape<'a, T> {
    /// Create a recognizer.
    pub fn new(
        name: &'static str,
        recognize: impl Fn(&JsonObject) -> Recognition<T> + 'a,
    ) -> Self {
        Self {
            name,
            recognize: Box::new(recognize),
        }
    }

    /// Shape name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Run `shapes` in order over `object`.
///
/// # Errors
///
/// Returns [`DecodeError::Shape`] for the first malformed shape, or
/// [`DecodeError::NoMatchingShape`] when none applied.
pub fn recognize<T>(
    response: &'static str,
    object: &JsonObject,
    shapes: &[Shape<'_, T>],
) -> Result<T, DecodeError> {
    for shape in shapes {
        match (shape.recognize)(object) {
            Recognition::Matched(value) => return Ok(value),
            Recognition::NotApplicable => continue,
            Recognition::Malformed(step) => return Err(DecodeError::Shape { response, step }),
        }
    }

    Err(DecodeError::NoMatchingShape {
        response,
        tried: shapes
            .iter()
            .map(Shape::name)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Parse a payload that must be a JSON object without an error field.
///
/// # Errors
///
/// Returns an error if the payload is not JSON, not an object, or carries a
/// server-reported error.
pub fn parse_object(payload: &[u8]) -> Result<JsonObject, DecodeError> {
    let value: Value = serde_json::from_slice(payload)?;
    let Value::Object(object) = value else {
        return Err(DecodeError::UnexpectedType { expected: "object" });
    };

    if let Some(message) = server_error(&object) {
        return Err(DecodeError::ServerReported { message });
    }

    Ok(object)
}

/// Parse a payload that must be a JSON array.
///
/// # Errors
///
/// Returns an error if the payload is not JSON, is an error object, or is
/// not an array.
pub fn parse_array(payload: &[u8]) -> Result<Vec<Value>, DecodeError> {
    match serde_json::from_slice(payload)? {
        Value::Array(items) => Ok(items),
        Value::Object(object) => match server_error(&object) {
            Some(message) => Err(DecodeError::ServerReported { message }),
            None => Err(DecodeError::UnexpectedType { expected: "array" }),
        },
        _ => Err(DecodeError::UnexpectedType { expected: "array" }),
    }
}

/// Extract the server message when `object` carries an error marker.
///
/// Any non-null `error` value marks an error, `false` included. The message
/// comes from `message`, or from `error` itself when it is a string or an
/// object with a `message` field.
#[must_use]
pub fn server_error(object: &JsonObject) -> Option<String> {
    let error = object.get("error")?;
    if error.is_null() {
        return None;
    }

    let message = object
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .or_else(|| error.get("message").and_then(Value::as_str))
        .unwrap_or_default();

    Some(message.to_string())
}

/// Read a timetoken sent either as a JSON string or a number.
#[must_use]
pub fn timetoken(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}
