//! Signals: small, unstored messages delivered on the listeners' signal
//! channel.

use super::{ensure, reasons};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, to_json, Operation};
use pulse_protocol::encoding::url_encode;
use pulse_protocol::publish::{decode_publish, PublishResult};
use pulse_protocol::{OperationType, Query};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[must_use = "builders do nothing until executed"]
pub struct SignalBuilder<'a> {
    context: &'a ClientContext,
    channel: String,
    message: Option<Value>,
    cancel: Option<CancellationToken>,
}

impl<'a> SignalBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            channel: String::new(),
            message: None,
            cancel: None,
        }
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn message(mut self, message: impl Into<Value>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Send the signal and return its timetoken.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the response is
    /// malformed.
    pub async fn execute(self) -> CallResult<PublishResult> {
        execute(&self, self.cancel.as_ref())
            .await?
            .decode(|body| decode_publish(body))
    }
}

impl Operation for SignalBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Signal
    }

    fn validate(&self) -> Result<(), PulseError> {
        let kind = OperationType::Signal;
        let config = self.context.config();
        ensure(!config.publish_key.is_empty(), kind, reasons::MISSING_PUBLISH_KEY)?;
        ensure(!config.subscribe_key.is_empty(), kind, reasons::MISSING_SUBSCRIBE_KEY)?;
        ensure(!self.channel.is_empty(), kind, reasons::MISSING_CHANNEL)?;
        ensure(self.message.is_some(), kind, reasons::MISSING_MESSAGE)
    }

    fn build_path(&self) -> Result<String, PulseError> {
        let config = self.context.config();
        let message = match &self.message {
            Some(message) => to_json(message)?,
            None => {
                return Err(PulseError::validation(
                    OperationType::Signal,
                    reasons::MISSING_MESSAGE,
                ))
            }
        };
        Ok(format!(
            "/signal/{}/{}/0/{}/0/{}",
            config.publish_key,
            config.subscribe_key,
            url_encode(&self.channel),
            url_encode(&message)
        ))
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        Ok(default_query(self.context))
    }

    fn affected_channels(&self) -> Vec<String> {
        vec![self.channel.clone()]
    }
}
