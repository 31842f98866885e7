//! HTTP transport abstraction for Pulse.
//!
//! The request executor talks to the service only through [`HttpTransport`],
//! so it can run over any HTTP stack and be tested against canned responses.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Method name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including the encoded query.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Deadline for establishing the connection.
    pub connect_timeout: Duration,
    /// Deadline for the whole request.
    pub request_timeout: Duration,
}

impl HttpRequest {
    /// Create a GET request with the given timeouts.
    #[must_use]
    pub fn get(url: impl Into<String>, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            connect_timeout,
            request_timeout,
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Get a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status code is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection was not established in time.
    #[error("Connect timed out")]
    ConnectTimeout,

    /// The request did not complete in time.
    #[error("Request timed out")]
    RequestTimeout,

    /// The request was cancelled by the caller.
    #[error("Request cancelled")]
    Cancelled,

    /// The service could not be reached.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// The request failed after the connection was established.
    #[error("Request failed: {0}")]
    Request(String),

    /// The request could not be sent as built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Whether this error is one of the timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectTimeout | TransportError::RequestTimeout
        )
    }
}

/// A transport that can issue HTTP requests.
///
/// Implementations are shared by every call of a client and must honor the
/// per-request timeouts.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and wait for the full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Get the transport name (e.g., "reqwest", "mock").
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = HttpRequest::get("https://example.com", Duration::from_secs(1), Duration::from_secs(1))
            .with_header("Content-Type", "application/json");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(403, "").is_success());
    }

    #[test]
    fn test_timeout_errors() {
        assert!(TransportError::ConnectTimeout.is_timeout());
        assert!(TransportError::RequestTimeout.is_timeout());
        assert!(!TransportError::Cancelled.is_timeout());
    }
}
