use super::{ensure, reasons, to_strings};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, to_json, Operation};
use pulse_protocol::encoding::{encode_list, join_list, url_encode};
use pulse_protocol::presence::decode_set_state;
use pulse_protocol::{OperationType, Query};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Attach presence state to this client on channels and channel groups.
#[must_use = "builders do nothing until executed"]
pub struct SetStateBuilder<'a> {
    context: &'a ClientContext,
    channels: Vec<String>,
    channel_groups: Vec<String>,
    state: Option<Value>,
    cancel: Option<CancellationToken>,
}

impl<'a> SetStateBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            channels: Vec::new(),
            channel_groups: Vec::new(),
            state: None,
            cancel: None,
        }
    }

    pub fn channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = to_strings(channels);
        self
    }

    pub fn channel_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel_groups = to_strings(groups);
        self
    }

    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Store the state and return what the service recorded.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the response is
    /// malformed.
    pub async fn execute(self) -> CallResult<Value> {
        execute(&self, self.cancel.as_ref())
            .await?
            .decode(|body| decode_set_state(body))
    }
}

impl Operation for SetStateBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::SetState
    }

    fn validate(&self) -> Result<(), PulseError> {
        let kind = OperationType::SetState;
        ensure(
            !self.context.config().subscribe_key.is_empty(),
            kind,
            reasons::MISSING_SUBSCRIBE_KEY,
        )?;
        ensure(
            !self.channels.is_empty() || !self.channel_groups.is_empty(),
            kind,
            reasons::MISSING_SELECTOR,
        )?;
        ensure(self.state.is_some(), kind, reasons::MISSING_STATE)
    }

    fn build_path(&self) -> Result<String, PulseError> {
        let config = self.context.config();
        Ok(format!(
            "/v2/presence/sub-key/{}/channel/{}/uuid/{}/data",
            config.subscribe_key,
            encode_list(&self.channels),
            url_encode(&config.uuid)
        ))
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        let mut query = default_query(self.context);
        if let Some(state) = &self.state {
            query.set("state", to_json(state)?);
        }
        query.set_non_empty("channel-group", join_list(&self.channel_groups));
        Ok(query)
    }

    fn affected_channels(&self) -> Vec<String> {
        self.channels.clone()
    }

    fn affected_channel_groups(&self) -> Vec<String> {
        self.channel_groups.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::context;
    use serde_json::json;

    #[test]
    fn test_request() {
        let (ctx, _) = context("sub", "pub");
        let op = SetStateBuilder::new(&ctx)
            .channels(["a", "b"])
            .state(json!({"mood": "ok"}));

        assert!(op.validate().is_ok());
        assert_eq!(
            op.build_path().unwrap(),
            "/v2/presence/sub-key/sub/channel/a,b/uuid/test-uuid/data"
        );
        assert_eq!(op.build_query().unwrap().get("state"), Some(r#"{"mood":"ok"}"#));
    }

    #[test]
    fn test_missing_state() {
        let (ctx, _) = context("sub", "pub");
        assert!(matches!(
            SetStateBuilder::new(&ctx).channels(["a"]).validate(),
            Err(PulseError::Validation { reason: reasons::MISSING_STATE, .. })
        ));
    }

    #[tokio::test]
    async fn test_execute() {
        let (ctx, mock) = context("sub", "pub");
        mock.push_response(200, r#"{"status":200,"message":"OK","payload":{"mood":"ok"}}"#);

        let response = SetStateBuilder::new(&ctx)
            .channel_groups(["g"])
            .state(json!({"mood": "ok"}))
            .execute()
            .await
            .unwrap();

        assert_eq!(response.data, json!({"mood": "ok"}));
        assert_eq!(response.status.affected_channel_groups, vec!["g"]);
        let url = mock.last_request().unwrap().url;
        assert!(url.contains("channel-group=g"));
        assert!(url.contains("/channel/,/uuid/"));
    }
}
