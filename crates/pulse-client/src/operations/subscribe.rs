//! One subscribe long-poll.
//!
//! A poll with a zero cursor is the handshake: it returns immediately with
//! the cursor to resume from. Later polls block until messages arrive or
//! the server times the poll out.

use super::{ensure, reasons, to_strings};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, Operation};
use pulse_protocol::encoding::{encode_list, join_list};
use pulse_protocol::{Cursor, OperationType, Query, SubscribeEnvelope};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[must_use = "builders do nothing until executed"]
pub struct SubscribeBuilder<'a> {
    context: &'a ClientContext,
    channels: Vec<String>,
    channel_groups: Vec<String>,
    cursor: Cursor,
    cancel: Option<CancellationToken>,
}

impl<'a> SubscribeBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            channels: Vec::new(),
            channel_groups: Vec::new(),
            cursor: Cursor::default(),
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

    /// Resume from `cursor`; the default cursor performs a handshake.
    pub fn cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the poll.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the envelope is
    /// malformed.
    pub async fn execute(self) -> CallResult<SubscribeEnvelope> {
        execute(&self, self.cancel.as_ref())
            .await?
            .decode(|body| SubscribeEnvelope::decode(body))
    }
}

impl Operation for SubscribeBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Subscribe
    }

    fn validate(&self) -> Result<(), PulseError> {
        let kind = OperationType::Subscribe;
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
            "/v2/subscribe/{}/{}/0",
            self.context.config().subscribe_key,
            encode_list(&self.channels)
        ))
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        let config = self.context.config();
        let mut query = default_query(self.context);

        query.set("tt", self.cursor.timetoken.to_string());
        if self.cursor.region != 0 {
            query.set("tr", self.cursor.region.to_string());
        }
        query.set_non_empty("channel-group", join_list(&self.channel_groups));
        if config.presence_timeout > 0 {
            query.set("heartbeat", config.presence_timeout.to_string());
        }
        if let Some(filter) = &config.filter_expression {
            query.set_non_empty("filter-expr", filter.as_str());
        }

        Ok(query)
    }

    fn request_timeout(&self) -> Duration {
        self.context.config().subscribe_timeout()
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
    fn test_handshake_request() {
        let (ctx, _) = context("sub", "pub");
        let op = SubscribeBuilder::new(&ctx).channels(["a", "b c"]);

        assert_eq!(op.build_path().unwrap(), "/v2/subscribe/sub/a,b%20c/0");
        let query = op.build_query().unwrap();
        assert_eq!(query.get("tt"), Some("0"));
        assert!(!query.contains("tr"));
        assert_eq!(query.get("heartbeat"), Some("300"));
        assert_eq!(op.request_timeout(), Duration::from_millis(310_000));
    }

    #[test]
    fn test_resume_request() {
        let (ctx, _) = context("sub", "pub");
        let op = SubscribeBuilder::new(&ctx)
            .channel_groups(["g"])
            .cursor(Cursor {
                timetoken: 15_000,
                region: 4,
            });

        assert_eq!(op.build_path().unwrap(), "/v2/subscribe/sub/,/0");
        let query = op.build_query().unwrap();
        assert_eq!(query.get("tt"), Some("15000"));
        assert_eq!(query.get("tr"), Some("4"));
        assert_eq!(query.get("channel-group"), Some("g"));
    }

    #[tokio::test]
    async fn test_execute() {
        let (ctx, mock) = context("sub", "pub");
        mock.push_response(
            200,
            r#"{"t":{"t":"16000","r":2},"m":[{"a":"1","f":0,"i":"pub-1","p":{"t":"15999","r":2},"k":"sub","c":"a","d":{"text":"hi"}}]}"#,
        );

        let response = SubscribeBuilder::new(&ctx).channels(["a"]).execute().await.unwrap();
        assert_eq!(response.data.cursor.timetoken, 16_000);
        assert_eq!(response.data.messages.len(), 1);
        assert_eq!(response.data.messages[0].timetoken(), 15_999);
    }
}
