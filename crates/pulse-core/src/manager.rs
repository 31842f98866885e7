//! Listener registry and event dispatcher.
//!
//! Every announce snapshots the registered listeners and spawns one task that
//! offers the event to all of them concurrently. The task races the exit
//! signal of the event's [`ExitGroup`] captured at announce time, so a single
//! slow listener never blocks the producer and removal never waits for
//! deliveries to finish.

use crate::event::{Event, EventKind, ExitGroup};
use crate::listener::{Listener, ListenerId, ListenerSinks, Sink};
use crate::message::MessageEvent;
use crate::objects::{MembershipEvent, MessageActionEvent, SpaceEvent, UserEvent};
use crate::presence::PresenceEvent;
use crate::status::Status;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

type Selector<T> = for<'a> fn(&'a ListenerSinks) -> &'a Sink<T>;

/// The set of registered listeners.
///
/// Announces must be called from within a Tokio runtime.
pub struct ListenerManager {
    listeners: RwLock<HashMap<ListenerId, Arc<ListenerSinks>>>,
    /// Exit signal of the status, presence, signal and object event kinds.
    exit_events: Mutex<CancellationToken>,
    /// Exit signal of message deliveries.
    exit_messages: Mutex<CancellationToken>,
}

impl ListenerManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            exit_events: Mutex::new(CancellationToken::new()),
            exit_messages: Mutex::new(CancellationToken::new()),
        }
    }

    /// Register a listener. Re-adding a listener replaces its entry.
    pub fn add_listener(&self, listener: &Listener) {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners.insert(listener.id(), listener.sinks());
        debug!(listener = ?listener.id(), total = listeners.len(), "Listener added");
    }

    /// Unregister a listener.
    ///
    /// Stops every in-flight non-message announce: listeners that had not
    /// yet taken the event miss it. Returns whether the listener was
    /// registered.
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        self.fire_exit(ExitGroup::Events);

        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let removed = listeners.remove(&listener.id()).is_some();
        debug!(listener = ?listener.id(), removed, total = listeners.len(), "Listener removed");
        removed
    }

    /// Unregister every listener and stop all in-flight announces.
    pub fn remove_all_listeners(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.fire_exit(ExitGroup::Events);
        self.fire_exit(ExitGroup::Messages);
        debug!("All listeners removed");
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Announce any event on the channel of its kind.
    pub fn announce(&self, event: Event) -> JoinHandle<usize> {
        match event {
            Event::Status(e) => self.announce_status(e),
            Event::Message(e) => self.announce_message(e),
            Event::Presence(e) => self.announce_presence(e),
            Event::Signal(e) => self.announce_signal(e),
            Event::User(e) => self.announce_user_event(e),
            Event::Space(e) => self.announce_space_event(e),
            Event::Membership(e) => self.announce_membership_event(e),
            Event::MessageAction(e) => self.announce_message_action_event(e),
        }
    }

    /// Deliver a status to every listener.
    ///
    /// Returns the delivery task, which yields the number of listeners that
    /// took the event. Dropping the handle does not stop delivery.
    pub fn announce_status(&self, status: Status) -> JoinHandle<usize> {
        self.dispatch(EventKind::Status, status, |s| &s.status)
    }

    pub fn announce_message(&self, message: MessageEvent) -> JoinHandle<usize> {
        self.dispatch(EventKind::Message, message, |s| &s.message)
    }

    pub fn announce_presence(&self, presence: PresenceEvent) -> JoinHandle<usize> {
        self.dispatch(EventKind::Presence, presence, |s| &s.presence)
    }

    pub fn announce_signal(&self, signal: MessageEvent) -> JoinHandle<usize> {
        self.dispatch(EventKind::Signal, signal, |s| &s.signal)
    }

    pub fn announce_user_event(&self, event: UserEvent) -> JoinHandle<usize> {
        self.dispatch(EventKind::User, event, |s| &s.user)
    }

    pub fn announce_space_event(&self, event: SpaceEvent) -> JoinHandle<usize> {
        self.dispatch(EventKind::Space, event, |s| &s.space)
    }

    pub fn announce_membership_event(&self, event: MembershipEvent) -> JoinHandle<usize> {
        self.dispatch(EventKind::Membership, event, |s| &s.membership)
    }

    pub fn announce_message_action_event(&self, event: MessageActionEvent) -> JoinHandle<usize> {
        self.dispatch(EventKind::MessageAction, event, |s| &s.message_action)
    }

    fn dispatch<T>(&self, kind: EventKind, event: T, select: Selector<T>) -> JoinHandle<usize>
    where
        T: Send + Sync + 'static,
    {
        let snapshot = self.snapshot();
        let exit = self.exit_token(kind.exit_group());
        let event = Arc::new(event);

        tokio::spawn(async move {
            let listeners = snapshot.len();
            let mut offers: FuturesUnordered<_> = snapshot
                .iter()
                .map(|sinks| select(sinks).offer(Arc::clone(&event)))
                .collect();

            let cancelled = exit.cancelled();
            tokio::pin!(cancelled);

            let mut delivered = 0;
            loop {
                tokio::select! {
                    biased;
                    () = &mut cancelled => {
                        debug!(%kind, delivered, listeners, "Announce stopped by exit signal");
                        break;
                    }
                    next = offers.next() => match next {
                        Some(true) => delivered += 1,
                        Some(false) => {}
                        None => break,
                    },
                }
            }

            trace!(%kind, delivered, listeners, "Announce finished");
            delivered
        })
    }

    fn snapshot(&self) -> Vec<Arc<ListenerSinks>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn exit_slot(&self, group: ExitGroup) -> &Mutex<CancellationToken> {
        match group {
            ExitGroup::Events => &self.exit_events,
            ExitGroup::Messages => &self.exit_messages,
        }
    }

    fn exit_token(&self, group: ExitGroup) -> CancellationToken {
        self.exit_slot(group)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel the group's current signal and install a fresh one for later
    /// announces.
    fn fire_exit(&self, group: ExitGroup) {
        let previous = {
            let mut slot = self.exit_slot(group).lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, CancellationToken::new())
        };
        previous.cancel();
    }
}

impl Default for ListenerManager {
    fn default() -> Self {
        Self::new()
    }
}
