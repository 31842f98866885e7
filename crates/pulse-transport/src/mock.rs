//! In-memory transport with canned responses.
//!
//! Used by tests and benchmarks to drive the request pipeline without a
//! network. Every request is recorded so tests can assert on the URL, headers
//! and body that were produced.

use crate::traits::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Transport answering from a queue of canned results.
///
/// Once the queue is empty, every request gets the fallback response
/// (`200` with an empty JSON object unless changed).
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: Mutex<HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(HttpResponse::new(200, "{}")),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Delay every response by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response.
    pub fn push_response(&self, status: u16, body: impl Into<bytes::Bytes>) {
        self.push_result(Ok(HttpResponse::new(status, body)));
    }

    /// Queue a transport error.
    pub fn push_error(&self, error: TransportError) {
        self.push_result(Err(error));
    }

    fn push_result(&self, result: Result<HttpResponse, TransportError>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Response returned once the queue is drained.
    pub fn set_fallback(&self, status: u16, body: impl Into<bytes::Bytes>) {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) =
            HttpResponse::new(status, body);
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request sent so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match queued {
            Some(result) => result,
            None => Ok(self
                .fallback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
