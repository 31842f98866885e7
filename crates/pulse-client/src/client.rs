//! Client facade.
//!
//! [`PulseClient`] owns the configuration snapshot, the transport and the
//! listener registry, and hands out one builder per call.

use crate::config::ClientConfig;
use crate::context::ClientContext;
use crate::metrics;
use crate::operations::{
    GetStateBuilder, GrantBuilder, HereNowBuilder, LeaveBuilder, PublishBuilder, SetStateBuilder,
    SignalBuilder, SubscribeBuilder, TimeBuilder,
};
use crate::subscription::Subscriber;
use std::sync::Arc;
use tenvis_pulse_core::{Listener, ListenerManager};
use tenvis_pulse_transport::HttpTransport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Entry point for every call.
///
/// ```rust,ignore
/// let client = PulseClient::new(ClientConfig::new("sub-key", "pub-key"));
/// let listener = client.new_listener();
/// client.add_listener(&listener);
///
/// let sent = client.publish().channel("room").message("hello").execute().await?;
/// println!("published at {}", sent.data.timetoken);
/// ```
pub struct PulseClient {
    context: Arc<ClientContext>,
    listeners: Arc<ListenerManager>,
    shutdown: CancellationToken,
}

impl PulseClient {
    /// Create a client over the default `reqwest` transport.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(tenvis_pulse_transport::ReqwestTransport::new()))
    }

    /// Create a client over a custom transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        info!(
            origin = %config.origin,
            uuid = %config.uuid,
            transport = transport.name(),
            "Client created"
        );
        Self {
            context: Arc::new(ClientContext::new(config, transport)),
            listeners: Arc::new(ListenerManager::new()),
            shutdown: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        self.context.config()
    }

    #[must_use]
    pub fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    pub fn publish(&self) -> PublishBuilder<'_> {
        PublishBuilder::new(&self.context)
    }

    /// A publish that is neither stored in history nor replicated.
    pub fn fire(&self) -> PublishBuilder<'_> {
        PublishBuilder::fire(&self.context)
    }

    pub fn signal(&self) -> SignalBuilder<'_> {
        SignalBuilder::new(&self.context)
    }

    pub fn get_state(&self) -> GetStateBuilder<'_> {
        GetStateBuilder::new(&self.context)
    }

    pub fn set_state(&self) -> SetStateBuilder<'_> {
        SetStateBuilder::new(&self.context)
    }

    pub fn here_now(&self) -> HereNowBuilder<'_> {
        HereNowBuilder::new(&self.context)
    }

    pub fn leave(&self) -> LeaveBuilder<'_> {
        LeaveBuilder::new(&self.context)
    }

    pub fn time(&self) -> TimeBuilder<'_> {
        TimeBuilder::new(&self.context)
    }

    pub fn grant(&self) -> GrantBuilder<'_> {
        GrantBuilder::new(&self.context)
    }

    /// A single subscribe long-poll. Most applications want
    /// [`PulseClient::subscriber`] instead.
    pub fn subscribe(&self) -> SubscribeBuilder<'_> {
        SubscribeBuilder::new(&self.context)
    }

    /// A subscription consumer delivering to this client's listeners.
    #[must_use]
    pub fn subscriber<C, G, S>(&self, channels: C, channel_groups: G) -> Subscriber
    where
        C: IntoIterator<Item = S>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Subscriber::new(
            self.context.clone(),
            self.listeners.clone(),
            channels.into_iter().map(Into::into).collect(),
            channel_groups.into_iter().map(Into::into).collect(),
        )
    }

    /// Token cancelled by [`PulseClient::destroy`]; pass it to
    /// [`Subscriber::run`] or any builder's `cancel_token`.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// A listener sized by the configured buffer.
    #[must_use]
    pub fn new_listener(&self) -> Listener {
        Listener::with_options(self.context.config().listener_options())
    }

    pub fn add_listener(&self, listener: &Listener) {
        self.listeners.add_listener(listener);
        metrics::set_active_listeners(self.listeners.listener_count());
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        let removed = self.listeners.remove_listener(listener);
        metrics::set_active_listeners(self.listeners.listener_count());
        removed
    }

    pub fn remove_all_listeners(&self) {
        self.listeners.remove_all_listeners();
        metrics::set_active_listeners(0);
    }

    #[must_use]
    pub fn listener_manager(&self) -> &Arc<ListenerManager> {
        &self.listeners
    }

    /// Replace the access token sent as `auth`; `None` falls back to the
    /// configured auth key.
    pub fn set_token(&self, token: Option<String>) {
        self.context.set_token(token);
    }

    /// Cancel in-flight work started with [`PulseClient::shutdown_token`]
    /// and drop every listener.
    pub fn destroy(&self) {
        debug!("Destroying client");
        self.shutdown.cancel();
        self.remove_all_listeners();
    }
}

impl std::fmt::Debug for PulseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseClient")
            .field("context", &self.context)
            .field("listeners", &self.listeners.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PulseError;
    use std::time::Duration;
    use tenvis_pulse_core::StatusCategory;
    use tenvis_pulse_transport::MockTransport;

    fn client() -> (PulseClient, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_millis(50)));
        let config = ClientConfig::new("sub", "pub")
            .with_uuid("client-uuid")
            .with_auth_key("auth-key")
            .with_origin("ps.example.com", true);
        (PulseClient::with_transport(config, mock.clone()), mock)
    }

    #[tokio::test]
    async fn test_calls_share_context() {
        let (client, mock) = client();
        mock.push_response(200, "[17]");
        mock.push_response(200, r#"[1,"Sent","18"]"#);

        assert_eq!(client.time().execute().await.unwrap().data, 17);
        let sent = client
            .publish()
            .channel("room")
            .message("hi")
            .execute()
            .await
            .unwrap();
        assert_eq!(sent.data.timetoken, 18);
        assert_eq!(sent.status.auth_key.as_deref(), Some("auth-key"));

        let requests = mock.requests();
        assert!(requests[0].url.contains("seqn=1"));
        assert!(requests[1].url.contains("seqn=2"));
        assert!(requests[1].url.contains("auth=auth-key"));
        assert!(requests[1].url.contains("uuid=client-uuid"));
    }

    #[tokio::test]
    async fn test_token_replaces_auth_key() {
        let (client, mock) = client();
        client.set_token(Some("tok".into()));
        client.here_now().execute().await.unwrap_err();
        assert!(mock.last_request().unwrap().url.contains("auth=tok"));
    }

    #[tokio::test]
    async fn test_destroy_cancels_and_clears() {
        let (client, _) = client();
        let listener = client.new_listener();
        client.add_listener(&listener);
        assert_eq!(client.listener_manager().listener_count(), 1);

        let token = client.shutdown_token();
        let call = client.time().cancel_token(token).execute();
        client.destroy();

        let failure = call.await.unwrap_err();
        assert!(matches!(failure.error, PulseError::Transport(_)));
        assert_eq!(failure.status.category, StatusCategory::Cancelled);
        assert_eq!(client.listener_manager().listener_count(), 0);
    }

    #[test]
    fn test_remove_listener() {
        let (client, _) = client();
        let listener = client.new_listener();
        client.add_listener(&listener);
        assert!(client.remove_listener(&listener));
        assert!(!client.remove_listener(&listener));
    }
}
