//! The tagged event union delivered to listeners.

use crate::message::MessageEvent;
use crate::objects::{MembershipEvent, MessageActionEvent, SpaceEvent, UserEvent};
use crate::presence::PresenceEvent;
use crate::status::Status;
use std::fmt;

/// Any event a listener can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Status(Status),
    Message(MessageEvent),
    Presence(PresenceEvent),
    Signal(MessageEvent),
    User(UserEvent),
    Space(SpaceEvent),
    Membership(MembershipEvent),
    MessageAction(MessageActionEvent),
}

/// Event kind, one per listener channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Status,
    Message,
    Presence,
    Signal,
    User,
    Space,
    Membership,
    MessageAction,
}

/// Kinds that share one cancellation signal.
///
/// Removing a listener stops in-flight deliveries of the events group only;
/// message deliveries are stopped on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitGroup {
    Messages,
    Events,
}

impl EventKind {
    #[must_use]
    pub fn exit_group(&self) -> ExitGroup {
        match self {
            EventKind::Message => ExitGroup::Messages,
            _ => ExitGroup::Events,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Status => "status",
            EventKind::Message => "message",
            EventKind::Presence => "presence",
            EventKind::Signal => "signal",
            EventKind::User => "user",
            EventKind::Space => "space",
            EventKind::Membership => "membership",
            EventKind::MessageAction => "message_action",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Status(_) => EventKind::Status,
            Event::Message(_) => EventKind::Message,
            Event::Presence(_) => EventKind::Presence,
            Event::Signal(_) => EventKind::Signal,
            Event::User(_) => EventKind::User,
            Event::Space(_) => EventKind::Space,
            Event::Membership(_) => EventKind::Membership,
            Event::MessageAction(_) => EventKind::MessageAction,
        }
    }
}
