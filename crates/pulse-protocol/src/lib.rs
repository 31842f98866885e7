//! # pulse-protocol
//!
//! Wire layer of the Pulse realtime client.
//!
//! This crate has no I/O. It covers what goes on and comes off the wire:
//!
//! - percent-encoding of path and query components ([`encoding`])
//! - ordered query parameters ([`Query`])
//! - operation kinds and SDK identity
//! - access-manager request signing ([`signature`])
//! - shape-tolerant response decoders ([`presence`], [`publish`], [`grant`],
//!   [`subscribe`])
//!
//! ## Example
//!
//! ```rust
//! use pulse_protocol::{encoding, presence};
//!
//! assert_eq!(encoding::url_encode("\"test\""), "%22test%22");
//!
//! let states = presence::decode_state(br#"{"channel":"c1","payload":{"x":1}}"#).unwrap();
//! assert_eq!(states["c1"]["x"], 1);
//! ```

pub mod encoding;
pub mod grant;
pub mod operation;
pub mod presence;
pub mod publish;
pub mod query;
pub mod response;
pub mod signature;
pub mod subscribe;
pub mod version;

pub use operation::OperationType;
pub use query::Query;
pub use response::{DecodeError, JsonObject};
pub use subscribe::{Cursor, MessageType, SubscribeEnvelope, SubscribeMessage};
pub use version::{sdk_identifier, Version, SDK_NAME, SDK_VERSION};
