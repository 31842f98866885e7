//! # pulse-client
//!
//! Client runtime for the Pulse realtime messaging service.
//!
//! Every API call is an operation descriptor built by [`PulseClient`] and
//! driven by the shared request [executor](executor::execute). Results come
//! back as [`Response`] or [`Failure`], both carrying the call's
//! [`Status`](tenvis_pulse_core::Status).
//!
//! ```rust,ignore
//! use tenvis_pulse_client::{ClientConfig, PulseClient};
//!
//! let client = PulseClient::new(ClientConfig::load()?);
//! let listener = client.new_listener();
//! client.add_listener(&listener);
//!
//! let mut subscriber = client.subscriber(["room"], Vec::<String>::new());
//! tokio::spawn(async move { subscriber.run(client.shutdown_token()).await });
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod operation;
pub mod operations;
pub mod subscription;

pub use client::PulseClient;
pub use config::ClientConfig;
pub use context::ClientContext;
pub use error::{CallResult, Failure, PulseError, Response};
pub use operation::Operation;
pub use subscription::Subscriber;
