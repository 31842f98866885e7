//! Subscription consumer.
//!
//! A [`Subscriber`] runs subscribe long-polls and routes every message of
//! each envelope to the listener registry. Presence channels carry the
//! `-pnpres` suffix; other messages are routed by their `e` type tag.
//!
//! There is no reconnection logic: a failed poll is announced as a status
//! and returned to the caller.

use crate::context::ClientContext;
use crate::error::Failure;
use crate::executor::{execute, status};
use crate::metrics;
use crate::operations::SubscribeBuilder;
use pulse_protocol::subscribe::PRESENCE_SUFFIX;
use pulse_protocol::{Cursor, MessageType, SubscribeEnvelope, SubscribeMessage};
use std::sync::Arc;
use tenvis_pulse_core::{
    ListenerManager, MembershipEvent, MessageActionEvent, MessageEvent, ObjectKind, PresenceEvent,
    SpaceEvent, StatusCategory, UserEvent,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Long-poll loop over a fixed set of channels and channel groups.
pub struct Subscriber {
    context: Arc<ClientContext>,
    listeners: Arc<ListenerManager>,
    channels: Vec<String>,
    channel_groups: Vec<String>,
    cursor: Cursor,
}

impl Subscriber {
    #[must_use]
    pub fn new(
        context: Arc<ClientContext>,
        listeners: Arc<ListenerManager>,
        channels: Vec<String>,
        channel_groups: Vec<String>,
    ) -> Self {
        Self {
            context,
            listeners,
            channels,
            channel_groups,
            cursor: Cursor::default(),
        }
    }

    /// Also subscribe to the presence channel of every channel.
    #[must_use]
    pub fn with_presence(mut self) -> Self {
        let presence: Vec<String> = self
            .channels
            .iter()
            .filter(|c| !c.ends_with(PRESENCE_SUFFIX))
            .map(|c| format!("{}{}", c, PRESENCE_SUFFIX))
            .collect();
        self.channels.extend(presence);
        self
    }

    /// Resume from a known cursor instead of handshaking.
    #[must_use]
    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Run one long-poll and route its messages.
    ///
    /// The first poll is a handshake: it announces a `Connected` status and
    /// routes nothing. Returns the number of messages routed.
    ///
    /// # Errors
    ///
    /// Returns the call's [`Failure`] after announcing its status.
    pub async fn poll_once(&mut self, cancel: Option<&CancellationToken>) -> Result<usize, Failure> {
        let handshake = self.cursor.timetoken == 0;
        let request = SubscribeBuilder::new(&self.context)
            .channels(self.channels.iter().cloned())
            .channel_groups(self.channel_groups.iter().cloned())
            .cursor(self.cursor);

        let result = match execute(&request, cancel).await {
            Ok(response) => response.decode(|body| SubscribeEnvelope::decode(body)),
            Err(failure) => Err(failure),
        };
        let envelope = match result {
            Ok(response) => response.data,
            Err(failure) => {
                warn!(category = failure.status.category.name(), error = %failure.error, "Subscribe failed");
                self.listeners.announce_status(failure.status.clone());
                return Err(failure);
            }
        };

        trace!(
            timetoken = envelope.cursor.timetoken,
            region = envelope.cursor.region,
            messages = envelope.messages.len(),
            "Subscribe envelope"
        );
        self.cursor = envelope.cursor;

        if handshake {
            info!(channels = ?self.channels, groups = ?self.channel_groups, "Subscribed");
            self.listeners
                .announce_status(status(&request, StatusCategory::Connected).with_status_code(200));
            return Ok(0);
        }

        let count = envelope.messages.len();
        for message in &envelope.messages {
            self.route(message);
        }
        metrics::record_subscribe_messages(count);
        Ok(count)
    }

    /// Poll until `cancel` fires or a poll fails.
    ///
    /// Cancellation announces a `Disconnected` status.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first failed poll.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), Failure> {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.poll_once(Some(&cancel)).await {
                Ok(_) => {}
                Err(_) if cancel.is_cancelled() => break,
                Err(failure) => return Err(failure),
            }
        }

        info!(channels = ?self.channels, "Unsubscribed");
        let request = SubscribeBuilder::new(&self.context)
            .channels(self.channels.iter().cloned())
            .channel_groups(self.channel_groups.iter().cloned());
        self.listeners
            .announce_status(status(&request, StatusCategory::Disconnected));
        Ok(())
    }

    fn route(&self, message: &SubscribeMessage) {
        let channel = message.base_channel();
        let subscription = message.subscription().map(str::to_string);
        let timetoken = message.timetoken();

        if message.is_presence() {
            let mut event = PresenceEvent::from_payload(channel, &message.payload);
            event.subscription = subscription;
            event.timetoken = timetoken;
            self.listeners.announce_presence(event);
            return;
        }

        match message.kind() {
            MessageType::Message | MessageType::Signal => {
                let mut event = MessageEvent::new(channel, message.payload.clone())
                    .with_timetoken(timetoken);
                if let Some(publisher) = &message.issuing_client {
                    event = event.with_publisher(publisher.as_str());
                }
                event.subscription = subscription;
                event.user_metadata = message.user_metadata.clone();

                if message.kind() == MessageType::Signal {
                    self.listeners.announce_signal(event);
                } else {
                    self.listeners.announce_message(event);
                }
            }
            MessageType::Objects => match ObjectKind::of(&message.payload) {
                Some(ObjectKind::User) => {
                    let mut event = UserEvent::from_payload(channel, &message.payload);
                    event.subscription = subscription;
                    event.timetoken = timetoken;
                    self.listeners.announce_user_event(event);
                }
                Some(ObjectKind::Space) => {
                    let mut event = SpaceEvent::from_payload(channel, &message.payload);
                    event.subscription = subscription;
                    event.timetoken = timetoken;
                    self.listeners.announce_space_event(event);
                }
                Some(ObjectKind::Membership) => {
                    let mut event = MembershipEvent::from_payload(channel, &message.payload);
                    event.subscription = subscription;
                    event.timetoken = timetoken;
                    self.listeners.announce_membership_event(event);
                }
                None => debug!(channel, "Dropping objects message of unknown type"),
            },
            MessageType::MessageAction => {
                let mut event = MessageActionEvent::from_payload(channel, &message.payload);
                event.subscription = subscription;
                event.timetoken = timetoken;
                self.listeners.announce_message_action_event(event);
            }
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("channels", &self.channels)
            .field("channel_groups", &self.channel_groups)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::time::Duration;
    use tenvis_pulse_core::{Listener, ListenerOptions};
    use tenvis_pulse_transport::{MockTransport, TransportError};

    fn subscriber(channels: &[&str]) -> (Subscriber, Arc<MockTransport>, Listener) {
        subscriber_over(MockTransport::new(), channels)
    }

    fn subscriber_over(
        mock: MockTransport,
        channels: &[&str],
    ) -> (Subscriber, Arc<MockTransport>, Listener) {
        let mock = Arc::new(mock);
        let config = ClientConfig::new("sub", "pub")
            .with_uuid("test-uuid")
            .with_origin("ps.example.com", true);
        let context = Arc::new(ClientContext::new(config, mock.clone()));
        let listeners = Arc::new(ListenerManager::new());
        let listener = Listener::with_options(ListenerOptions { buffer_size: 16 });
        listeners.add_listener(&listener);

        let channels = channels.iter().map(|c| c.to_string()).collect();
        (
            Subscriber::new(context, listeners, channels, Vec::new()),
            mock,
            listener,
        )
    }

    const HANDSHAKE: &str = r#"{"t":{"t":"100","r":1},"m":[]}"#;

    #[tokio::test]
    async fn test_handshake_announces_connected() {
        let (mut sub, mock, mut listener) = subscriber(&["a"]);
        mock.push_response(200, HANDSHAKE);

        assert_eq!(sub.poll_once(None).await.unwrap(), 0);
        assert_eq!(sub.cursor().timetoken, 100);
        assert_eq!(sub.cursor().region, 1);

        let status = listener.status.recv().await.unwrap();
        assert_eq!(status.category, StatusCategory::Connected);
        assert_eq!(status.affected_channels, vec!["a"]);
        assert!(mock.last_request().unwrap().url.contains("tt=0"));
    }

    #[tokio::test]
    async fn test_routes_every_kind() {
        let (mut sub, mock, mut listener) = subscriber(&["a"]);
        mock.push_response(200, HANDSHAKE);
        mock.push_response(
            200,
            r#"{"t":{"t":"200","r":1},"m":[
                {"c":"a","i":"pub-1","d":{"text":"hi"},"p":{"t":"150","r":1},"u":{"m":1}},
                {"c":"a","e":1,"d":"ping","p":{"t":"151","r":1}},
                {"c":"a-pnpres","d":{"action":"join","uuid":"bob","occupancy":2},"p":{"t":"152","r":1}},
                {"c":"a","e":2,"d":{"source":"objects","event":"update","type":"user","data":{"id":"u1","name":"Ann"}}},
                {"c":"a","e":2,"d":{"source":"objects","event":"create","type":"space","data":{"id":"s1"}}},
                {"c":"a","e":2,"d":{"source":"objects","event":"delete","type":"membership","data":{"userId":"u1","spaceId":"s1"}}},
                {"c":"a","e":3,"d":{"event":"added","data":{"type":"reaction","value":"smile","uuid":"bob"}}}
            ]}"#,
        );

        sub.poll_once(None).await.unwrap();
        assert_eq!(sub.poll_once(None).await.unwrap(), 7);
        assert!(mock.last_request().unwrap().url.contains("tt=100"));
        assert!(mock.last_request().unwrap().url.contains("tr=1"));

        let message = listener.message.recv().await.unwrap();
        assert_eq!(message.message["text"], "hi");
        assert_eq!(message.publisher.as_deref(), Some("pub-1"));
        assert_eq!(message.timetoken, 150);
        assert!(message.user_metadata.is_some());

        let signal = listener.signal.recv().await.unwrap();
        assert_eq!(signal.message, "ping");

        let presence = listener.presence.recv().await.unwrap();
        assert_eq!(presence.channel, "a");
        assert_eq!(presence.event, "join");
        assert_eq!(presence.timetoken, 152);

        assert_eq!(listener.user_event.recv().await.unwrap().user_id, "u1");
        assert_eq!(listener.space_event.recv().await.unwrap().event, "create");
        assert_eq!(listener.membership_event.recv().await.unwrap().event, "delete");
        assert_eq!(
            listener.message_action_event.recv().await.unwrap().action_value,
            "smile"
        );
    }

    #[tokio::test]
    async fn test_wildcard_subscription_is_reported() {
        let (mut sub, mock, mut listener) = subscriber(&["sports.*"]);
        sub = sub.with_cursor(Cursor {
            timetoken: 10,
            region: 0,
        });
        mock.push_response(
            200,
            r#"{"t":{"t":"11","r":0},"m":[{"c":"sports.golf","b":"sports.*","d":1}]}"#,
        );

        sub.poll_once(None).await.unwrap();
        let message = listener.message.recv().await.unwrap();
        assert_eq!(message.channel, "sports.golf");
        assert_eq!(message.subscription.as_deref(), Some("sports.*"));
    }

    #[tokio::test]
    async fn test_failure_is_announced() {
        let (mut sub, mock, mut listener) = subscriber(&["a"]);
        mock.push_error(TransportError::Connect("refused".into()));

        let failure = sub.poll_once(None).await.unwrap_err();
        assert_eq!(failure.status.category, StatusCategory::NetworkIssues);

        let status = listener.status.recv().await.unwrap();
        assert_eq!(status.category, StatusCategory::NetworkIssues);
        assert_eq!(sub.cursor().timetoken, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (mut sub, mock, mut listener) = subscriber_over(
            MockTransport::new().with_delay(Duration::from_millis(20)),
            &["a"],
        );
        mock.push_response(200, HANDSHAKE);
        mock.set_fallback(200, r#"{"t":{"t":"101","r":1},"m":[]}"#);

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        sub.run(cancel).await.unwrap();

        assert_eq!(listener.status.recv().await.unwrap().category, StatusCategory::Connected);
        let disconnected = tokio::time::timeout(Duration::from_secs(1), async {
            while let Some(status) = listener.status.recv().await {
                if status.category == StatusCategory::Disconnected {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(disconnected);
    }

    #[test]
    fn test_with_presence() {
        let (sub, _, _) = subscriber(&["a", "b-pnpres"]);
        let sub = sub.with_presence();
        assert_eq!(sub.channels(), ["a", "b-pnpres", "a-pnpres"]);
    }
}
