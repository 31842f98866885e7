//! Publish and fire.
//!
//! A fire is a publish that the service neither stores in history nor
//! replicates to other regions; it only reaches server-side handlers.

use super::{ensure, reasons};
use crate::context::ClientContext;
use crate::error::{CallResult, PulseError};
use crate::executor::execute;
use crate::operation::{default_query, to_json, Operation};
use bytes::Bytes;
use pulse_protocol::encoding::url_encode;
use pulse_protocol::publish::{decode_publish, PublishResult};
use pulse_protocol::{OperationType, Query};
use serde_json::Value;
use tenvis_pulse_transport::Method;
use tokio_util::sync::CancellationToken;

/// Publish a message to a channel.
#[must_use = "builders do nothing until executed"]
pub struct PublishBuilder<'a> {
    context: &'a ClientContext,
    kind: OperationType,
    channel: String,
    message: Option<Value>,
    meta: Option<Value>,
    should_store: Option<bool>,
    replicate: bool,
    ttl: Option<u32>,
    use_post: bool,
    serialize: bool,
    cancel: Option<CancellationToken>,
}

impl<'a> PublishBuilder<'a> {
    pub(crate) fn new(context: &'a ClientContext) -> Self {
        Self {
            context,
            kind: OperationType::Publish,
            channel: String::new(),
            message: None,
            meta: None,
            should_store: None,
            replicate: true,
            ttl: None,
            use_post: false,
            serialize: true,
            cancel: None,
        }
    }

    /// A publish that is neither stored nor replicated.
    pub(crate) fn fire(context: &'a ClientContext) -> Self {
        Self {
            kind: OperationType::Fire,
            should_store: Some(false),
            replicate: false,
            ..Self::new(context)
        }
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Message payload; any JSON-serializable value.
    pub fn message(mut self, message: impl Into<Value>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Metadata used by server-side filter expressions.
    pub fn meta(mut self, meta: impl Into<Value>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Store in history. Ignored for fire.
    pub fn should_store(mut self, store: bool) -> Self {
        if self.kind == OperationType::Publish {
            self.should_store = Some(store);
        }
        self
    }

    /// Replicate to other regions. Ignored for fire.
    pub fn replicate(mut self, replicate: bool) -> Self {
        if self.kind == OperationType::Publish {
            self.replicate = replicate;
        }
        self
    }

    /// History retention in hours.
    pub fn ttl(mut self, hours: u32) -> Self {
        self.ttl = Some(hours);
        self
    }

    /// Send the message in a POST body instead of the path.
    pub fn use_post(mut self, use_post: bool) -> Self {
        self.use_post = use_post;
        self
    }

    /// With `false`, a POST body is sent as the raw string message, which
    /// must already be JSON.
    pub fn serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Publish and return the message timetoken.
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

    fn serialized_message(&self) -> Result<String, PulseError> {
        match &self.message {
            Some(message) => to_json(message),
            None => Err(PulseError::validation(self.kind, reasons::MISSING_MESSAGE)),
        }
    }
}

impl Operation for PublishBuilder<'_> {
    fn context(&self) -> &ClientContext {
        self.context
    }

    fn operation_type(&self) -> OperationType {
        self.kind
    }

    fn validate(&self) -> Result<(), PulseError> {
        let config = self.context.config();
        ensure(!config.publish_key.is_empty(), self.kind, reasons::MISSING_PUBLISH_KEY)?;
        ensure(!config.subscribe_key.is_empty(), self.kind, reasons::MISSING_SUBSCRIBE_KEY)?;
        ensure(!self.channel.is_empty(), self.kind, reasons::MISSING_CHANNEL)?;
        ensure(self.message.is_some(), self.kind, reasons::MISSING_MESSAGE)
    }

    fn build_path(&self) -> Result<String, PulseError> {
        let config = self.context.config();
        let base = format!(
            "/publish/{}/{}/0/{}/0",
            config.publish_key,
            config.subscribe_key,
            url_encode(&self.channel)
        );

        if self.use_post {
            return Ok(base);
        }
        Ok(format!("{}/{}", base, url_encode(&self.serialized_message()?)))
    }

    fn build_query(&self) -> Result<Query, PulseError> {
        let mut query = default_query(self.context);

        if let Some(meta) = &self.meta {
            query.set("meta", to_json(meta)?);
        }
        if let Some(store) = self.should_store {
            query.set("store", if store { "1" } else { "0" });
        }
        if !self.replicate {
            query.set("norep", "true");
        }
        if let Some(ttl) = self.ttl.filter(|t| *t > 0) {
            query.set("ttl", ttl.to_string());
        }

        Ok(query)
    }

    fn build_body(&self) -> Result<Bytes, PulseError> {
        if !self.use_post {
            return Ok(Bytes::new());
        }
        if self.serialize {
            return Ok(Bytes::from(self.serialized_message()?));
        }
        match &self.message {
            Some(Value::String(raw)) => Ok(Bytes::from(raw.clone())),
            Some(_) => Err(PulseError::Build(
                "an unserialized message must be a JSON string".to_string(),
            )),
            None => Err(PulseError::validation(self.kind, reasons::MISSING_MESSAGE)),
        }
    }

    fn http_method(&self) -> Method {
        if self.use_post {
            Method::Post
        } else {
            Method::Get
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        if self.use_post {
            vec![("Content-Type".to_string(), "application/json".to_string())]
        } else {
            Vec::new()
        }
    }

    fn affected_channels(&self) -> Vec<String> {
        vec![self.channel.clone()]
    }
}
