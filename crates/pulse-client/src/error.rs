//! Call results and errors.
//!
//! Every call returns `Result<Response<T>, Failure>`. Both sides carry the
//! call's [`Status`], so callers always learn the category, HTTP code and
//! affected selectors, whatever the outcome.

use pulse_protocol::{DecodeError, OperationType};
use tenvis_pulse_core::Status;
use tenvis_pulse_transport::TransportError;
use thiserror::Error;

/// Why a call failed.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Pre-flight validation failed; nothing was sent.
    #[error("{operation} validation failed: {reason}")]
    Validation {
        operation: OperationType,
        reason: &'static str,
    },

    /// The request could not be built.
    #[error("Failed to build request: {0}")]
    Build(String),

    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response payload could not be decoded.
    #[error("Failed to parse response: {0}")]
    ResponseParsing(DecodeError),

    /// The service reported an error.
    #[error("Server reported error ({status_code}): {message}")]
    ServerReported { status_code: u16, message: String },
}

impl PulseError {
    pub(crate) fn validation(operation: OperationType, reason: &'static str) -> Self {
        PulseError::Validation { operation, reason }
    }

    /// Map a decode error; server-reported payload errors keep their message.
    pub(crate) fn from_decode(error: DecodeError, status_code: u16) -> Self {
        match error {
            DecodeError::ServerReported { message } => PulseError::ServerReported {
                status_code,
                message,
            },
            other => PulseError::ResponseParsing(other),
        }
    }
}

/// A failed call.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Failure {
    #[source]
    pub error: PulseError,
    pub status: Status,
}

impl Failure {
    #[must_use]
    pub fn new(error: PulseError, status: Status) -> Self {
        Self { error, status }
    }
}

/// A successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub data: T,
    pub status: Status,
}

impl<T> Response<T> {
    /// Decode the payload into a typed value.
    ///
    /// A decode failure keeps the status, with the error flag set.
    pub(crate) fn decode<U>(
        self,
        decode: impl FnOnce(&T) -> Result<U, DecodeError>,
    ) -> Result<Response<U>, Failure> {
        match decode(&self.data) {
            Ok(data) => Ok(Response {
                data,
                status: self.status,
            }),
            Err(error) => {
                let error = PulseError::from_decode(error, self.status.status_code);
                let status = self.status.with_error(error.to_string());
                Err(Failure::new(error, status))
            }
        }
    }
}

/// Result of a call.
pub type CallResult<T> = Result<Response<T>, Failure>;
