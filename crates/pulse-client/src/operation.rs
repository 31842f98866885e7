//! The operation descriptor contract.
//!
//! Each API call is described by a value implementing [`Operation`]. The
//! executor drives every descriptor through the same steps: validate, build
//! path, query and body, then send.

use crate::context::ClientContext;
use crate::error::PulseError;
use bytes::Bytes;
use pulse_protocol::{sdk_identifier, OperationType, Query};
use std::time::Duration;
use tenvis_pulse_transport::Method;

/// A single API call.
pub trait Operation: Send + Sync {
    /// Client state the call runs against.
    fn context(&self) -> &ClientContext;

    fn operation_type(&self) -> OperationType;

    /// Check required configuration and parameters. Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Validation`] naming the missing input.
    fn validate(&self) -> Result<(), PulseError>;

    /// Request path with untrusted components percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Build`] if a component cannot be rendered.
    fn build_path(&self) -> Result<String, PulseError>;

    /// Query parameters, starting from [`default_query`].
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Build`] if a parameter cannot be rendered.
    fn build_query(&self) -> Result<Query, PulseError>;

    /// Request body; empty for GET calls.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Build`] if the body cannot be serialized.
    fn build_body(&self) -> Result<Bytes, PulseError> {
        Ok(Bytes::new())
    }

    fn http_method(&self) -> Method {
        Method::Get
    }

    /// Whether the `auth` parameter is attached.
    fn is_auth_required(&self) -> bool {
        true
    }

    fn connect_timeout(&self) -> Duration {
        self.context().config().connect_timeout()
    }

    fn request_timeout(&self) -> Duration {
        self.context().config().request_timeout()
    }

    /// Extra request headers.
    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Channels echoed into the status envelope.
    fn affected_channels(&self) -> Vec<String> {
        Vec::new()
    }

    /// Channel groups echoed into the status envelope.
    fn affected_channel_groups(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Parameters sent with every call: SDK identity, device uuid, request
/// sequence number and latency telemetry.
#[must_use]
pub fn default_query(context: &ClientContext) -> Query {
    let mut query = Query::new();
    query.set("pnsdk", sdk_identifier());
    query.set("uuid", context.config().uuid.as_str());
    query.set("seqn", context.next_sequence().to_string());
    if context.config().telemetry {
        query.extend(context.telemetry().operation_latency());
    }
    query
}

/// Serialize a JSON value for use in a path or query.
pub(crate) fn to_json(value: &impl serde::Serialize) -> Result<String, PulseError> {
    serde_json::to_string(value).map_err(|e| PulseError::Build(e.to_string()))
}
