//! Access-manager grants.
//!
//! Grants are signed with the secret key: the signature covers the method,
//! publish key, path and the sorted query, and is appended as the
//! `signature` parameter.

use super::{ensure, reasons, to_strings};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, Operation};
use pulse_protocol::encoding::join_list;
use pulse_protocol::grant::{decode_grant, GrantResult};
use pulse_protocol::signature::{sign, SignatureInput};
use pulse_protocol::{OperationType, Query};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

#[must_use = "builders do nothing until executed"]
pub struct GrantBuilder<'a> {
    context: &'a ClientContext,
    channels: Vec<String>,
    channel_groups: Vec<String>,
    auth_keys: Vec<String>,
    read: bool,
    write: bool,
    manage: bool,
    delete: bool,
    ttl: Option<i64>,
    timestamp: Option<u64>,
    cancel: Option<CancellationToken>,
}

impl<'a> GrantBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            channels: Vec::new(),
            channel_groups: Vec::new(),
            auth_keys: Vec::new(),
            read: false,
            write: false,
            manage: false,
            delete: false,
            ttl: None,
            timestamp: None,
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

    /// Restrict the grant to these auth keys.
    pub fn auth_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_keys = to_strings(keys);
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub fn manage(mut self, manage: bool) -> Self {
        self.manage = manage;
        self
    }

    pub fn delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    /// Grant lifetime in minutes. `0` grants indefinitely.
    pub fn ttl(mut self, minutes: i64) -> Self {
        self.ttl = Some(minutes);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[cfg(test)]
    fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Apply the grant and return the permissions in effect.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::Failure`] if the call fails or the response is
    /// malformed.
    pub async fn execute(self) -> CallResult<GrantResult> {
        execute(&self, self.cancel.as_ref())
            .await?
            .decode(|body| decode_grant(body))
    }

    fn timestamp(&self) -> u64 {
        self.timestamp.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        })
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

impl Operation for GrantBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        OperationType::Grant
    }

    fn validate(&self) -> Result<(), PulseError> {
        let kind = OperationType::Grant;
        let config = self.context.config();
        ensure(!config.subscribe_key.is_empty(), kind, reasons::MISSING_SUBSCRIBE_KEY)?;
        ensure(!config.publish_key.is_empty(), kind, reasons::MISSING_PUBLISH_KEY)?;
        ensure(
            config.secret_key.as_deref().is_some_and(|k| !k.is_empty()),
            kind,
            reasons::MISSING_SECRET_KEY,
        )
    }

    fn build_path(&self) -> Result<String, PulseError> {
        Ok(format!(
            "/v2/auth/grant/sub-key/{}",
            self.context.config().subscribe_key
        ))
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        let config = self.context.config();
        let mut query = default_query(self.context);

        query.set("r", flag(self.read));
        query.set("w", flag(self.write));
        query.set("m", flag(self.manage));
        query.set("d", flag(self.delete));
        if let Some(ttl) = self.ttl.filter(|t| *t >= 0) {
            query.set("ttl", ttl.to_string());
        }
        query.set_non_empty("channel", join_list(&self.channels));
        query.set_non_empty("channel-group", join_list(&self.channel_groups));
        query.set_non_empty("auth", join_list(&self.auth_keys));
        query.set("timestamp", self.timestamp().to_string());

        let secret_key = config.secret_key.as_deref().unwrap_or_default();
        let path = self.build_path()?;
        let signature = sign(
            secret_key,
            &SignatureInput {
                method: "GET",
                publish_key: &config.publish_key,
                path: &path,
                query: &query,
                body: b"",
            },
        )
        .map_err(|e| PulseError::Build(format!("Failed to sign request: {}", e)))?;
        query.set("signature", signature);

        Ok(query)
    }

    fn is_auth_required(&self) -> bool {
        false
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
    use crate::config::ClientConfig;
    use crate::operations::testing::context;
    use std::sync::Arc;
    use tenvis_pulse_transport::MockTransport;

    fn signing_context() -> (ClientContext, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        let config = ClientConfig::new("sub", "pub")
            .with_secret_key("secret")
            .with_auth_key("my-auth")
            .with_uuid("test-uuid")
            .with_origin("ps.example.com", true);
        (ClientContext::new(config, mock.clone()), mock)
    }

    #[test]
    fn test_query_is_signed() {
        let (ctx, _) = signing_context();
        let op = GrantBuilder::new(&ctx)
            .channels(["a", "b"])
            .auth_keys(["k1"])
            .read(true)
            .write(true)
            .ttl(60)
            .at(1_600_000_000);

        let query = op.build_query().unwrap();
        assert_eq!(query.get("r"), Some("1"));
        assert_eq!(query.get("w"), Some("1"));
        assert_eq!(query.get("m"), Some("0"));
        assert_eq!(query.get("d"), Some("0"));
        assert_eq!(query.get("ttl"), Some("60"));
        assert_eq!(query.get("channel"), Some("a,b"));
        assert_eq!(query.get("auth"), Some("k1"));
        assert_eq!(query.get("timestamp"), Some("1600000000"));

        let expected = sign(
            "secret",
            &SignatureInput {
                method: "GET",
                publish_key: "pub",
                path: "/v2/auth/grant/sub-key/sub",
                query: &query,
                body: b"",
            },
        )
        .unwrap();
        assert_eq!(query.get("signature"), Some(expected.as_str()));
        assert!(expected.starts_with("v2."));
    }

    #[test]
    fn test_missing_secret_key() {
        let (ctx, _) = context("sub", "pub");
        assert!(matches!(
            GrantBuilder::new(&ctx).validate(),
            Err(PulseError::Validation { reason: reasons::MISSING_SECRET_KEY, .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_does_not_attach_client_auth() {
        let (ctx, mock) = signing_context();
        mock.push_response(
            200,
            r#"{"message":"Success","payload":{"level":"channel","subscribe_key":"sub","ttl":60,"channel":"a","r":1,"w":1,"m":0,"d":0},"service":"Access Manager","status":200}"#,
        );

        let response = GrantBuilder::new(&ctx)
            .channels(["a"])
            .read(true)
            .write(true)
            .ttl(60)
            .execute()
            .await
            .unwrap();

        assert_eq!(response.data.level, "channel");
        assert!(response.data.channels["a"].permissions.write);
        let url = mock.last_request().unwrap().url;
        assert!(url.contains("signature=v2."));
        assert!(!url.contains("my-auth"));
    }
}
