//! Fetch presence state of a device on channels and channel groups.

use super::{ensure, reasons, to_strings};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, Operation};
use pulse_protocol::encoding::{encode_list, join_list, url_encode};
use pulse_protocol::presence::{decode_state, ChannelStates};
use pulse_protocol::{OperationType, Query};
use tokio_util::sync::CancellationToken;

#[must_use = "builders do nothing until executed"]
pub struct GetStateBuilder<'a> {
    context: &'a ClientContext,
    channels: Vec<String>,
    channel_groups: Vec<String>,
    uuid: Option<String>,
    cancel: Option<CancellationToken>,
}

impl<'a> GetStateBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            channels: Vec::new(),
            channel_groups: Vec::new(),
            uuid: None,
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

    /// Device to look up; defaults to this client's uuid.
    pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fetch the state, keyed by channel.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the response has
    /// no recognized shape.
    pub async fn execute(self) -> CallResult<ChannelStates> {
        execute(&self, self.cancel.as_ref())
            .await?
            .decode(|body| decode_state(body))
    }
}

impl Operation for GetStateBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::GetState
    }

    fn validate(&self) -> Result<(), PulseError> {
        let kind = OperationType::GetState;
        ensure(
            !self.context.config().subscribe_key.is_empty(),
            kind,
            reasons::MISSING_SUBSCRIBE_KEY,
        )?;
        ensure(
            !self.channels.is_empty() || !self.channel_groups.is_empty(),
            kind,
            reasons::MISSING_SELECTOR,
        )
    }

    fn build_path(&self) -> Result<String, PulseError> {
        let config = self.context.config();
        let uuid = self.uuid.as_deref().unwrap_or(&config.uuid);
        Ok(format!(
            "/v2/presence/sub-key/{}/channel/{}/uuid/{}",
            config.subscribe_key,
            encode_list(&self.channels),
            url_encode(uuid)
        ))
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        let mut query = default_query(self.context);
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
    use crate::PulseError;
    use serde_json::json;
    use tenvis_pulse_core::StatusCategory;

    #[test]
    fn test_path_and_query() {
        let (ctx, _) = context("sub", "pub");
        let op = GetStateBuilder::new(&ctx)
            .channels(["ch1", "ch 2"])
            .channel_groups(["g1", "g2"]);

        assert_eq!(
            op.build_path().unwrap(),
            "/v2/presence/sub-key/sub/channel/ch1,ch%202/uuid/test-uuid"
        );
        assert_eq!(op.build_query().unwrap().get("channel-group"), Some("g1,g2"));
    }

    #[test]
    fn test_groups_only() {
        let (ctx, _) = context("sub", "pub");
        let op = GetStateBuilder::new(&ctx).channel_groups(["g"]).uuid("other");
        assert!(op.validate().is_ok());
        assert_eq!(
            op.build_path().unwrap(),
            "/v2/presence/sub-key/sub/channel/,/uuid/other"
        );
    }

    #[test]
    fn test_missing_selector() {
        let (ctx, _) = context("sub", "pub");
        assert!(matches!(
            GetStateBuilder::new(&ctx).validate(),
            Err(PulseError::Validation { reason: reasons::MISSING_SELECTOR, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_subscribe_key_sends_nothing() {
        let (ctx, mock) = context("", "pub");
        let failure = GetStateBuilder::new(&ctx)
            .channels(["ch"])
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            PulseError::Validation { reason: reasons::MISSING_SUBSCRIBE_KEY, .. }
        ));
        assert_eq!(failure.status.category, StatusCategory::BadRequest);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_execute_both_shapes() {
        let (ctx, mock) = context("sub", "pub");
        mock.push_response(200, r#"{"status":200,"channel":"c1","payload":{"x":1}}"#);
        mock.push_response(200, r#"{"status":200,"payload":{"channels":{"c1":{"x":1},"c2":{"y":2}}}}"#);

        let single = GetStateBuilder::new(&ctx).channels(["c1"]).execute().await.unwrap();
        assert_eq!(single.data["c1"], json!({"x": 1}));

        let many = GetStateBuilder::new(&ctx)
            .channels(["c1", "c2"])
            .execute()
            .await
            .unwrap();
        assert_eq!(many.data.len(), 2);
        assert_eq!(many.data["c2"], json!({"y": 2}));
    }

    #[tokio::test]
    async fn test_execute_server_error() {
        let (ctx, mock) = context("sub", "pub");
        mock.push_response(200, r#"{"error":true,"message":"boom"}"#);

        let failure = GetStateBuilder::new(&ctx).channels(["c1"]).execute().await.unwrap_err();
        match failure.error {
            PulseError::ServerReported { message, .. } => assert_eq!(message, "boom"),
            other => panic!("Expected ServerReported error, got {:?}", other),
        }
        assert!(failure.status.error);
    }
}
