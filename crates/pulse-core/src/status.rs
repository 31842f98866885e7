//! Status envelopes.
//!
//! Every API call produces a [`Status`]. Streaming calls also push it to
//! listeners as a status event.

use pulse_protocol::OperationType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome category of a call or subscription state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCategory {
    /// The call succeeded.
    Acknowledgment,
    /// The subscription loop completed its handshake.
    Connected,
    /// The subscription loop stopped.
    Disconnected,
    /// Validation or request build failed, or the service answered 400.
    BadRequest,
    /// The service answered 403.
    AccessDenied,
    /// The connect or request deadline expired.
    Timeout,
    /// The caller cancelled the call.
    Cancelled,
    /// The service could not be reached.
    NetworkIssues,
    Unknown,
}

impl StatusCategory {
    /// Whether this category reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            StatusCategory::Acknowledgment
                | StatusCategory::Connected
                | StatusCategory::Disconnected
        )
    }

    /// Stable name used in logs and metrics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StatusCategory::Acknowledgment => "acknowledgment",
            StatusCategory::Connected => "connected",
            StatusCategory::Disconnected => "disconnected",
            StatusCategory::BadRequest => "bad_request",
            StatusCategory::AccessDenied => "access_denied",
            StatusCategory::Timeout => "timeout",
            StatusCategory::Cancelled => "cancelled",
            StatusCategory::NetworkIssues => "network_issues",
            StatusCategory::Unknown => "unknown",
        }
    }

    /// Category for a non-2xx HTTP status code.
    #[must_use]
    pub fn from_http_status(code: u16) -> Self {
        match code {
            400 => StatusCategory::BadRequest,
            403 => StatusCategory::AccessDenied,
            _ => StatusCategory::Unknown,
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-call outcome summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub category: StatusCategory,
    pub operation: OperationType,
    /// Set when the call failed.
    pub error: bool,
    /// Failure description, when `error` is set.
    pub error_data: Option<String>,
    /// HTTP status code, zero when no response was received.
    pub status_code: u16,
    pub uuid: String,
    pub auth_key: Option<String>,
    pub origin: String,
    pub tls_enabled: bool,
    pub affected_channels: Vec<String>,
    pub affected_channel_groups: Vec<String>,
}

impl Status {
    /// Create a status with no request details attached.
    #[must_use]
    pub fn new(category: StatusCategory, operation: OperationType) -> Self {
        Self {
            category,
            operation,
            error: category.is_error(),
            error_data: None,
            status_code: 0,
            uuid: String::new(),
            auth_key: None,
            origin: String::new(),
            tls_enabled: false,
            affected_channels: Vec::new(),
            affected_channel_groups: Vec::new(),
        }
    }

    /// Attach a failure description.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = true;
        self.error_data = Some(error.into());
        self
    }

    #[must_use]
    pub fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    /// Attach the selectors the call addressed.
    #[must_use]
    pub fn with_selectors(mut self, channels: Vec<String>, groups: Vec<String>) -> Self {
        self.affected_channels = channels;
        self.affected_channel_groups = groups;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_flag_follows_category() {
        assert!(!Status::new(StatusCategory::Acknowledgment, OperationType::Time).error);
        assert!(!Status::new(StatusCategory::Connected, OperationType::Subscribe).error);
        assert!(Status::new(StatusCategory::Timeout, OperationType::Time).error);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(StatusCategory::from_http_status(400), StatusCategory::BadRequest);
        assert_eq!(StatusCategory::from_http_status(403), StatusCategory::AccessDenied);
        assert_eq!(StatusCategory::from_http_status(502), StatusCategory::Unknown);
    }

    #[test]
    fn test_with_error() {
        let status = Status::new(StatusCategory::Acknowledgment, OperationType::Publish)
            .with_error("boom")
            .with_status_code(500);
        assert!(status.error);
        assert_eq!(status.error_data.as_deref(), Some("boom"));
        assert_eq!(status.status_code, 500);
    }
}
