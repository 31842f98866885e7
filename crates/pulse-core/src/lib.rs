//! # pulse-core
//!
//! Event model and listener fan-out for the Pulse realtime client.
//!
//! This crate provides:
//!
//! - **Events** - status, message, signal, presence, object and
//!   message-action events
//! - **Listener** - an application handle with one channel per event kind
//! - **ListenerManager** - the listener registry and concurrent dispatcher
//! - **TelemetryManager** - request latency averages reported to the service
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌────────────┐
//! │ Subscription │────▶│ ListenerManager │──┬─▶│ Listener 1 │
//! └──────────────┘     └─────────────────┘  │  └────────────┘
//!                              ▲            └─▶│ Listener N │
//!                       exit signals           └────────────┘
//! ```

pub mod event;
pub mod listener;
pub mod manager;
pub mod message;
pub mod objects;
pub mod presence;
pub mod status;
pub mod telemetry;

pub use event::{Event, EventKind, ExitGroup};
pub use listener::{EventReceiver, Listener, ListenerId, ListenerOptions};
pub use manager::ListenerManager;
pub use message::MessageEvent;
pub use objects::{MembershipEvent, MessageActionEvent, ObjectKind, SpaceEvent, UserEvent};
pub use presence::PresenceEvent;
pub use status::{Status, StatusCategory};
pub use telemetry::TelemetryManager;
