//! Operation descriptors, one per API call.
//!
//! Each descriptor is also the builder for its call: set parameters with the
//! chained setters, then `execute()`.

pub mod get_state;
pub mod grant;
pub mod here_now;
pub mod leave;
pub mod publish;
pub mod set_state;
pub mod signal;
pub mod subscribe;
pub mod time;

pub use get_state::GetStateBuilder;
pub use grant::GrantBuilder;
pub use here_now::HereNowBuilder;
pub use leave::LeaveBuilder;
pub use publish::PublishBuilder;
pub use set_state::SetStateBuilder;
pub use signal::SignalBuilder;
pub use subscribe::SubscribeBuilder;
pub use time::TimeBuilder;

use crate::error::PulseError;
use pulse_protocol::OperationType;

/// Validation failure reasons.
pub mod reasons {
    pub const MISSING_SUBSCRIBE_KEY: &str = "Missing Subscribe Key";
    pub const MISSING_PUBLISH_KEY: &str = "Missing Publish Key";
    pub const MISSING_SECRET_KEY: &str = "Missing Secret Key";
    pub const MISSING_CHANNEL: &str = "Missing Channel";
    pub const MISSING_SELECTOR: &str = "Missing Channel or Channel Group";
    pub const MISSING_MESSAGE: &str = "Missing Message";
    pub const MISSING_STATE: &str = "Missing State";
}

/// Fail validation with `reason` unless `ok`.
pub(crate) fn ensure(
    ok: bool,
    operation: OperationType,
    reason: &'static str,
) -> Result<(), PulseError> {
    if ok {
        Ok(())
    } else {
        Err(PulseError::validation(operation, reason))
    }
}

pub(crate) fn to_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::ClientConfig;
    use crate::context::ClientContext;
    use std::sync::Arc;
    use tenvis_pulse_transport::MockTransport;

    /// Context with demo keys over a mock transport.
    pub fn context(subscribe_key: &str, publish_key: &str) -> (ClientContext, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        let config = ClientConfig::new(subscribe_key, publish_key)
            .with_uuid("test-uuid")
            .with_origin("ps.example.com", true);
        (ClientContext::new(config, mock.clone()), mock)
    }
}
