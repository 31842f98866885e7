use super::{ensure, reasons, to_strings};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, Operation};
use pulse_protocol::encoding::{encode_list, join_list};
use pulse_protocol::presence::decode_leave;
use pulse_protocol::{OperationType, Query};
use tokio_util::sync::CancellationToken;

/// Announce that this client left channels and channel groups.
#[must_use = "builders do nothing until executed"]
pub struct LeaveBuilder<'a> {
    context: &'a ClientContext,
    channels: Vec<String>,
    channel_groups: Vec<String>,
    cancel: Option<CancellationToken>,
}

impl<'a> LeaveBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            channels: Vec::new(),
            channel_groups: Vec::new(),
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

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the service reports
    /// an error.
    pub async fn execute(self) -> CallResult<()> {
        execute(&self, self.cancel.as_ref())
            .await?
            .decode(|body| decode_leave(body))
    }
}

impl Operation for LeaveBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Leave
    }

    fn validate(&self) -> Result<(), PulseError> {
        let kind = OperationType::Leave;
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
        Ok(format!(
            "/v2/presence/sub-key/{}/channel/{}/leave",
            self.context.config().subscribe_key,
            encode_list(&self.channels)
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

    #[test]
    fn test_request() {
        let (ctx, _) = context("sub", "pub");
        let op = LeaveBuilder::new(&ctx).channels(["a"]).channel_groups(["g1", "g2"]);

        assert_eq!(op.build_path().unwrap(), "/v2/presence/sub-key/sub/channel/a/leave");
        assert_eq!(op.build_query().unwrap().get("channel-group"), Some("g1,g2"));
    }

    #[tokio::test]
    async fn test_execute() {
        let (ctx, mock) = context("sub", "pub");
        mock.push_response(200, r#"{"status":200,"message":"OK","action":"leave","service":"Presence"}"#);

        let response = LeaveBuilder::new(&ctx).channels(["a"]).execute().await.unwrap();
        assert_eq!(response.status.affected_channels, vec!["a"]);

        assert!(LeaveBuilder::new(&ctx).execute().await.is_err());
        assert_eq!(mock.calls(), 1);
    }
}
