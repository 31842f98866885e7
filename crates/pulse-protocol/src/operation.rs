//! Operation kinds.
//!
//! Every API call is tagged with the kind of operation it performs. The tag
//! travels with status envelopes and keys latency telemetry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The API call an operation descriptor represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Subscribe,
    Leave,
    Publish,
    Fire,
    Signal,
    GetState,
    SetState,
    HereNow,
    Time,
    Grant,
}

impl OperationType {
    /// Stable name used in logs and metrics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            OperationType::Subscribe => "subscribe",
            OperationType::Leave => "leave",
            OperationType::Publish => "publish",
            OperationType::Fire => "fire",
            OperationType::Signal => "signal",
            OperationType::GetState => "get_state",
            OperationType::SetState => "set_state",
            OperationType::HereNow => "here_now",
            OperationType::Time => "time",
            OperationType::Grant => "grant",
        }
    }

    /// Telemetry endpoint group, if latency for this kind is reported.
    ///
    /// Long-poll subscribe requests would skew averages and are excluded.
    #[must_use]
    pub fn telemetry_endpoint(&self) -> Option<&'static str> {
        match self {
            OperationType::Subscribe => None,
            OperationType::Publish | OperationType::Fire => Some("pub"),
            OperationType::Signal => Some("sig"),
            OperationType::Leave
            | OperationType::GetState
            | OperationType::SetState
            | OperationType::HereNow => Some("pres"),
            OperationType::Time => Some("time"),
            OperationType::Grant => Some("pam"),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_endpoints() {
        assert_eq!(OperationType::Publish.telemetry_endpoint(), Some("pub"));
        assert_eq!(OperationType::Fire.telemetry_endpoint(), Some("pub"));
        assert_eq!(OperationType::GetState.telemetry_endpoint(), Some("pres"));
        assert_eq!(OperationType::Subscribe.telemetry_endpoint(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(OperationType::HereNow.to_string(), "here_now");
    }
}
