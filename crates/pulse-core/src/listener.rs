//! Listener handles.
//!
//! A [`Listener`] owns one [`EventReceiver`] per event kind. The registry
//! only holds the sending halves, so unregistering a listener never closes
//! the receivers the application holds.
//!
//! By default every channel is a rendezvous: an offer completes only once the
//! listener has taken the event. Tokio channels cannot have zero capacity, so
//! a rendezvous offer parks the event in a one-slot channel together with an
//! acknowledgement sender and waits for the receiver to acknowledge it. If
//! the offer is abandoned first, the receiver finds the acknowledgement
//! closed and drops the stale event.

use crate::message::MessageEvent;
use crate::objects::{MembershipEvent, MessageActionEvent, SpaceEvent, UserEvent};
use crate::presence::PresenceEvent;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

static LISTENER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Registry key of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(LISTENER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Listener channel options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerOptions {
    /// Events queued per kind before offers wait. Zero means rendezvous.
    #[serde(default)]
    pub buffer_size: usize,
}

struct Delivery<T> {
    event: Arc<T>,
    ack: Option<oneshot::Sender<()>>,
}

/// Sending half of one listener channel.
pub(crate) struct Sink<T> {
    tx: mpsc::Sender<Delivery<T>>,
    rendezvous: bool,
}

impl<T> Sink<T> {
    /// Offer an event, returning whether the listener took it.
    ///
    /// Returns `false` without waiting once the receiver is gone.
    pub(crate) async fn offer(&self, event: Arc<T>) -> bool {
        let Ok(permit) = self.tx.reserve().await else {
            return false;
        };

        if !self.rendezvous {
            permit.send(Delivery { event, ack: None });
            return true;
        }

        let (ack, taken) = oneshot::channel();
        permit.send(Delivery {
            event,
            ack: Some(ack),
        });
        taken.await.is_ok()
    }
}

fn channel<T>(options: ListenerOptions) -> (Sink<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel(options.buffer_size.max(1));
    (
        Sink {
            tx,
            rendezvous: options.buffer_size == 0,
        },
        EventReceiver { rx },
    )
}

/// Receiving half of one listener channel.
pub struct EventReceiver<T> {
    rx: mpsc::Receiver<Delivery<T>>,
}

impl<T> EventReceiver<T> {
    /// Receive the next event.
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        loop {
            let delivery = self.rx.recv().await?;
            if let Some(event) = accept(delivery) {
                return Some(event);
            }
        }
    }

    /// Receive an event if one is ready.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] when no event is ready and
    /// [`TryRecvError::Disconnected`] once every sender is gone.
    pub fn try_recv(&mut self) -> Result<Arc<T>, TryRecvError> {
        loop {
            let delivery = self.rx.try_recv()?;
            if let Some(event) = accept(delivery) {
                return Ok(event);
            }
        }
    }
}

/// Acknowledge a delivery. Abandoned offers yield `None`.
fn accept<T>(delivery: Delivery<T>) -> Option<Arc<T>> {
    match delivery.ack {
        None => Some(delivery.event),
        Some(ack) => ack.send(()).ok().map(|()| delivery.event),
    }
}

/// The sending halves of every channel of one listener.
pub(crate) struct ListenerSinks {
    pub(crate) status: Sink<Status>,
    pub(crate) message: Sink<MessageEvent>,
    pub(crate) presence: Sink<PresenceEvent>,
    pub(crate) signal: Sink<MessageEvent>,
    pub(crate) user: Sink<UserEvent>,
    pub(crate) space: Sink<SpaceEvent>,
    pub(crate) membership: Sink<MembershipEvent>,
    pub(crate) message_action: Sink<MessageActionEvent>,
}

/// An application event consumer.
///
/// ```rust,no_run
/// # async fn run(manager: tenvis_pulse_core::ListenerManager) {
/// use tenvis_pulse_core::Listener;
///
/// let mut listener = Listener::new();
/// manager.add_listener(&listener);
///
/// loop {
///     tokio::select! {
///         Some(status) = listener.status.recv() => println!("{:?}", status.category),
///         Some(message) = listener.message.recv() => println!("{}", message.message),
///     }
/// }
/// # }
/// ```
pub struct Listener {
    pub status: EventReceiver<Status>,
    pub message: EventReceiver<MessageEvent>,
    pub presence: EventReceiver<PresenceEvent>,
    pub signal: EventReceiver<MessageEvent>,
    pub user_event: EventReceiver<UserEvent>,
    pub space_event: EventReceiver<SpaceEvent>,
    pub membership_event: EventReceiver<MembershipEvent>,
    pub message_action_event: EventReceiver<MessageActionEvent>,
    id: ListenerId,
    sinks: Arc<ListenerSinks>,
}

impl Listener {
    /// Create a listener with rendezvous channels.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ListenerOptions::default())
    }

    /// Create a listener with the given channel options.
    #[must_use]
    pub fn with_options(options: ListenerOptions) -> Self {
        let (status_tx, status) = channel(options);
        let (message_tx, message) = channel(options);
        let (presence_tx, presence) = channel(options);
        let (signal_tx, signal) = channel(options);
        let (user_tx, user_event) = channel(options);
        let (space_tx, space_event) = channel(options);
        let (membership_tx, membership_event) = channel(options);
        let (action_tx, message_action_event) = channel(options);

        Self {
            status,
            message,
            presence,
            signal,
            user_event,
            space_event,
            membership_event,
            message_action_event,
            id: ListenerId::next(),
            sinks: Arc::new(ListenerSinks {
                status: status_tx,
                message: message_tx,
                presence: presence_tx,
                signal: signal_tx,
                user: user_tx,
                space: space_tx,
                membership: membership_tx,
                message_action: action_tx,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub(crate) fn sinks(&self) -> Arc<ListenerSinks> {
        Arc::clone(&self.sinks)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unique_listener_ids() {
        assert_ne!(Listener::new().id(), Listener::new().id());
    }

    #[tokio::test]
    async fn test_rendezvous_offer_waits_for_receiver() {
        let (sink, mut rx) = channel::<u32>(ListenerOptions::default());

        let offer = tokio::spawn(async move { sink.offer(Arc::new(7)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!offer.is_finished());

        assert_eq!(*rx.recv().await.unwrap(), 7);
        assert!(offer.await.unwrap());
    }

    #[tokio::test]
    async fn test_abandoned_offer_is_discarded() {
        let (sink, mut rx) = channel::<u32>(ListenerOptions::default());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), sink.offer(Arc::new(1))).await;
        assert!(abandoned.is_err());

        let offer = tokio::spawn(async move { sink.offer(Arc::new(2)).await });
        assert_eq!(*rx.recv().await.unwrap(), 2);
        assert!(offer.await.unwrap());
    }

    #[tokio::test]
    async fn test_buffered_offer_completes_without_receiver() {
        let options = ListenerOptions { buffer_size: 2 };
        let (sink, mut rx) = channel::<u32>(options);

        assert!(sink.offer(Arc::new(1)).await);
        assert!(sink.offer(Arc::new(2)).await);
        assert_eq!(*rx.try_recv().unwrap(), 1);
        assert_eq!(*rx.try_recv().unwrap(), 2);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_offer_to_dropped_receiver() {
        let (sink, rx) = channel::<u32>(ListenerOptions::default());
        drop(rx);
        assert!(!sink.offer(Arc::new(1)).await);
    }
}
