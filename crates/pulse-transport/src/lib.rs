//! # pulse-transport
//!
//! HTTP transport abstraction layer for the Pulse realtime client.
//!
//! The request pipeline is transport-agnostic. This crate provides:
//!
//! - **HttpTransport** - the trait every transport implements
//! - **ReqwestTransport** - pooled `reqwest` clients (feature `reqwest`, on
//!   by default)
//! - **MockTransport** - canned responses with request recording
//!
//! ```rust,ignore
//! use pulse_transport::{HttpRequest, HttpTransport, ReqwestTransport};
//!
//! let transport = ReqwestTransport::new();
//! let response = transport
//!     .send(HttpRequest::get(url, connect_timeout, request_timeout))
//!     .await?;
//! ```

pub mod mock;
pub mod traits;

#[cfg(feature = "reqwest")]
pub mod http;

pub use mock::MockTransport;
pub use traits::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

#[cfg(feature = "reqwest")]
pub use http::{ReqwestConfig, ReqwestTransport};
