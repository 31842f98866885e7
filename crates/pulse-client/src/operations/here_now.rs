//! Occupancy of channels, or of the whole key set when no channel is named.

use super::{ensure, reasons, to_strings};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, Operation};
use pulse_protocol::encoding::{encode_list, join_list};
use pulse_protocol::presence::{decode_here_now, HereNow};
use pulse_protocol::{OperationType, Query};
use tokio_util::sync::CancellationToken;

#[must_use = "builders do nothing until executed"]
pub struct HereNowBuilder<'a> {
    context: &'a ClientContext,
    channels: Vec<String>,
    channel_groups: Vec<String>,
    include_uuids: bool,
    include_state: bool,
    cancel: Option<CancellationToken>,
}

impl<'a> HereNowBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            channels: Vec::new(),
            channel_groups: Vec::new(),
            include_uuids: true,
            include_state: false,
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

    /// List occupant uuids. On by default.
    pub fn include_uuids(mut self, include: bool) -> Self {
        self.include_uuids = include;
        self
    }

    /// Include each occupant's state.
    pub fn include_state(mut self, include: bool) -> Self {
        self.include_state = include;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fetch occupancy.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the response has
    /// no recognized shape.
    pub async fn execute(self) -> CallResult<HereNow> {
        let response = execute(&self, self.cancel.as_ref()).await?;
        response.decode(|body| decode_here_now(body, &self.channels))
    }

    fn is_global(&self) -> bool {
        self.channels.is_empty() && self.channel_groups.is_empty()
    }
}

impl Operation for HereNowBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::HereNow
    }

    fn validate(&self) -> Result<(), PulseError> {
        ensure(
            !self.context.config().subscribe_key.is_empty(),
            OperationType::HereNow,
            reasons::MISSING_SUBSCRIBE_KEY,
        )
    }

    fn build_path(&self) -> Result<String, PulseError> {
        let subscribe_key = &self.context.config().subscribe_key;
        if self.is_global() {
            return Ok(format!("/v2/presence/sub-key/{}", subscribe_key));
        }
        Ok(format!(
            "/v2/presence/sub-key/{}/channel/{}",
            subscribe_key,
            encode_list(&self.channels)
        ))
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        let mut query = default_query(self.context);
        query.set_non_empty("channel-group", join_list(&self.channel_groups));
        if !self.include_uuids {
            query.set("disable_uuids", "1");
        }
        if self.include_state {
            query.set("state", "1");
        }
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

    #[test]
    fn test_global_path() {
        let (ctx, _) = context("sub", "pub");
        let op = HereNowBuilder::new(&ctx);
        assert!(op.validate().is_ok());
        assert_eq!(op.build_path().unwrap(), "/v2/presence/sub-key/sub");
    }

    #[test]
    fn test_channel_path_and_flags() {
        let (ctx, _) = context("sub", "pub");
        let op = HereNowBuilder::new(&ctx)
            .channels(["a", "b"])
            .include_uuids(false)
            .include_state(true);

        assert_eq!(op.build_path().unwrap(), "/v2/presence/sub-key/sub/channel/a,b");
        let query = op.build_query().unwrap();
        assert_eq!(query.get("disable_uuids"), Some("1"));
        assert_eq!(query.get("state"), Some("1"));
    }

    #[test]
    fn test_groups_only_path() {
        let (ctx, _) = context("sub", "pub");
        let op = HereNowBuilder::new(&ctx).channel_groups(["g"]);
        assert_eq!(op.build_path().unwrap(), "/v2/presence/sub-key/sub/channel/,");
        assert!(!op.build_query().unwrap().contains("disable_uuids"));
    }

    #[tokio::test]
    async fn test_execute_single_channel() {
        let (ctx, mock) = context("sub", "pub");
        mock.push_response(
            200,
            r#"{"status":200,"message":"OK","occupancy":2,"uuids":["u1","u2"],"service":"Presence"}"#,
        );

        let response = HereNowBuilder::new(&ctx).channels(["room"]).execute().await.unwrap();
        assert_eq!(response.data.total_occupancy, 2);
        assert_eq!(response.data.channels[0].channel, "room");
        assert_eq!(response.data.channels[0].occupants.len(), 2);
    }

    #[tokio::test]
    async fn test_execute_malformed() {
        let (ctx, mock) = context("sub", "pub");
        mock.push_response(200, r#"{"status":200,"occupancy":"two"}"#);

        let failure = HereNowBuilder::new(&ctx).channels(["room"]).execute().await.unwrap_err();
        assert!(matches!(failure.error, PulseError::ResponseParsing(_)));
        assert_eq!(failure.status.status_code, 200);
    }
}
