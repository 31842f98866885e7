use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, Operation};
use pulse_protocol::publish::decode_time;
use pulse_protocol::{OperationType, Query};
use tokio_util::sync::CancellationToken;

/// Fetch the service's current timetoken.
#[must_use = "builders do nothing until executed"]
pub struct TimeBuilder<'a> {
    context: &'a ClientContext,
    cancel: Option<CancellationToken>,
}

impl<'a> TimeBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            cancel: None,
        }
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the response is not
    /// a one-element timetoken array.
    pub async fn execute(self) -> CallResult<i64> {
        execute(&self, self.cancel.as_ref())
            .await?
            .decode(|body| decode_time(body))
    }
}

impl Operation for TimeBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Time
    }

    fn validate(&self) -> Result<(), PulseError> {
        Ok(())
    }

    fn build_path(&self) -> Result<String, PulseError> {
        Ok("/time/0".to_string())
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        Ok(default_query(self.context))
    }

    fn is_auth_required(&self) -> bool {
        false
    }
}
