//! Request executor.
//!
//! Drives an [`Operation`] from validation to a raw payload and its status.
//! The executor never retries; every failure is reported once, categorised.

use crate::error::{CallResult, Failure, PulseError, Response};
use crate::metrics;
use crate::operation::Operation;
use bytes::Bytes;
use pulse_protocol::response::server_error;
use std::time::Instant;
use tenvis_pulse_core::{Status, StatusCategory};
use tenvis_pulse_transport::{HttpRequest, HttpResponse, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Longest server message kept from a non-JSON error body.
const MAX_ERROR_BODY: usize = 512;

/// Execute a call.
///
/// Validation and build failures return a `BadRequest` status without any
/// transport call. The request is bounded by the operation's connect and
/// request timeouts and raced against `cancel`.
///
/// # Errors
///
/// Returns a [`Failure`] carrying the error and the call's status.
pub async fn execute<O>(operation: &O, cancel: Option<&CancellationToken>) -> CallResult<Bytes>
where
    O: Operation + ?Sized,
{
    let kind = operation.operation_type();
    let started = Instant::now();

    if let Err(error) = operation.validate() {
        debug!(operation = %kind, %error, "Validation failed");
        return Err(fail(operation, StatusCategory::BadRequest, 0, error, started));
    }

    let request = match build_request(operation) {
        Ok(request) => request,
        Err(error) => {
            debug!(operation = %kind, %error, "Request build failed");
            return Err(fail(operation, StatusCategory::BadRequest, 0, error, started));
        }
    };

    debug!(operation = %kind, method = %request.method, url = %request.url, "Issuing request");
    let deadline = request.connect_timeout + request.request_timeout;
    let send = tokio::time::timeout(deadline, operation.context().transport().send(request));

    let result = match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(TransportError::Cancelled),
            result = send => result.unwrap_or(Err(TransportError::RequestTimeout)),
        },
        None => send
            .await
            .unwrap_or(Err(TransportError::RequestTimeout)),
    };

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            let category = transport_category(&error);
            warn!(operation = %kind, %error, "Request failed");
            return Err(fail(operation, category, 0, error.into(), started));
        }
    };

    if !response.is_success() {
        let message = server_message(&response);
        let category = StatusCategory::from_http_status(response.status);
        warn!(operation = %kind, status = response.status, %message, "Server rejected request");
        let error = PulseError::ServerReported {
            status_code: response.status,
            message,
        };
        return Err(fail(operation, category, response.status, error, started));
    }

    let elapsed = started.elapsed();
    let context = operation.context();
    if context.config().telemetry {
        context.telemetry().store_latency(kind, elapsed);
    }
    metrics::record_request(kind.name(), StatusCategory::Acknowledgment.name(), elapsed);
    trace!(
        operation = %kind,
        status = response.status,
        bytes = response.body.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Request succeeded"
    );

    Ok(Response {
        data: response.body,
        status: status(operation, StatusCategory::Acknowledgment).with_status_code(response.status),
    })
}

fn build_request<O>(operation: &O) -> Result<HttpRequest, PulseError>
where
    O: Operation + ?Sized,
{
    let context = operation.context();
    let config = context.config();

    let path = operation.build_path()?;
    let mut query = operation.build_query()?;
    let body = operation.build_body()?;

    if operation.is_auth_required() {
        if let Some(auth) = context.auth() {
            query.set("auth", auth);
        }
    }

    let mut url = format!("{}://{}{}", config.scheme(), config.origin, path);
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.encode());
    }

    Ok(HttpRequest {
        method: operation.http_method(),
        url,
        headers: operation.headers(),
        body,
        connect_timeout: operation.connect_timeout(),
        request_timeout: operation.request_timeout(),
    })
}

/// Base status of a call with request details filled in.
pub(crate) fn status<O>(operation: &O, category: StatusCategory) -> Status
where
    O: Operation + ?Sized,
{
    let context = operation.context();
    let config = context.config();
    let mut status = Status::new(category, operation.operation_type()).with_selectors(
        operation.affected_channels(),
        operation.affected_channel_groups(),
    );
    status.uuid = config.uuid.clone();
    status.auth_key = context.auth();
    status.origin = config.origin.clone();
    status.tls_enabled = config.secure;
    status
}

fn fail<O>(
    operation: &O,
    category: StatusCategory,
    status_code: u16,
    error: PulseError,
    started: Instant,
) -> Failure
where
    O: Operation + ?Sized,
{
    metrics::record_request(operation.operation_type().name(), category.name(), started.elapsed());
    let status = status(operation, category)
        .with_status_code(status_code)
        .with_error(error.to_string());
    Failure::new(error, status)
}

fn transport_category(error: &TransportError) -> StatusCategory {
    match error {
        TransportError::ConnectTimeout | TransportError::RequestTimeout => StatusCategory::Timeout,
        TransportError::Cancelled => StatusCategory::Cancelled,
        TransportError::Connect(_) | TransportError::Request(_) => StatusCategory::NetworkIssues,
        TransportError::InvalidRequest(_) => StatusCategory::BadRequest,
    }
}

/// Message of a rejected request: the JSON `message`/`error` field when
/// present, otherwise the raw body.
fn server_message(response: &HttpResponse) -> String {
    let parsed = serde_json::from_slice::<serde_json::Value>(&response.body).ok();
    if let Some(message) = parsed
        .as_ref()
        .and_then(serde_json::Value::as_object)
        .and_then(|object| {
            server_error(object).filter(|m| !m.is_empty()).or_else(|| {
                object
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
        })
    {
        return message;
    }

    let text = String::from_utf8_lossy(&response.body);
    text.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::context::ClientContext;
    use pulse_protocol::{OperationType, Query};
    use std::sync::Arc;
    use std::time::Duration;
    use tenvis_pulse_transport::{Method, MockTransport};

    struct Probe {
        context: ClientContext,
        valid: bool,
        auth: bool,
    }

    impl Operation for Probe {
        fn context(&self) -> &ClientContext {
            &self.context
        }

        fn operation_type(&self) -> OperationType {
            OperationType::Time
        }

        fn validate(&self) -> Result<(), PulseError> {
            if self.valid {
                Ok(())
            } else {
                Err(PulseError::validation(OperationType::Time, "Missing Subscribe Key"))
            }
        }

        fn build_path(&self) -> Result<String, PulseError> {
            Ok("/time/0".to_string())
        }

        fn build_query(&self) -> Result<Query, PulseError> {
            Ok([("k", "v")].into_iter().collect())
        }

        fn is_auth_required(&self) -> bool {
            self.auth
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_millis(200)
        }

        fn connect_timeout(&self) -> Duration {
            Duration::from_millis(100)
        }

        fn affected_channels(&self) -> Vec<String> {
            vec!["ch".to_string()]
        }
    }

    fn probe(mock: &Arc<MockTransport>, config: ClientConfig) -> Probe {
        Probe {
            context: ClientContext::new(config, mock.clone()),
            valid: true,
            auth: true,
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("sub", "pub").with_origin("ps.example.com", true)
    }

    #[tokio::test]
    async fn test_validation_failure_skips_transport() {
        let mock = Arc::new(MockTransport::new());
        let mut op = probe(&mock, config());
        op.valid = false;

        let failure = execute(&op, None).await.unwrap_err();
        assert!(matches!(failure.error, PulseError::Validation { .. }));
        assert_eq!(failure.status.category, StatusCategory::BadRequest);
        assert_eq!(failure.status.affected_channels, vec!["ch"]);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_success() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(200, "[15000000000000000]");
        let op = probe(&mock, config());

        let response = execute(&op, None).await.unwrap();
        assert_eq!(&response.data[..], b"[15000000000000000]");
        assert_eq!(response.status.category, StatusCategory::Acknowledgment);
        assert_eq!(response.status.status_code, 200);
        assert!(response.status.tls_enabled);

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "https://ps.example.com/time/0?k=v");
    }

    #[tokio::test]
    async fn test_auth_attached_only_when_required() {
        let mock = Arc::new(MockTransport::new());
        let mut op = probe(&mock, config().with_auth_key("secret auth"));

        execute(&op, None).await.unwrap();
        assert!(mock.last_request().unwrap().url.ends_with("auth=secret%20auth&k=v"));

        op.context.set_token(Some("tok".into()));
        execute(&op, None).await.unwrap();
        assert!(mock.last_request().unwrap().url.ends_with("auth=tok&k=v"));

        op.auth = false;
        execute(&op, None).await.unwrap();
        assert!(!mock.last_request().unwrap().url.contains("auth="));
    }

    #[tokio::test]
    async fn test_transport_error_categories() {
        let cases = [
            (TransportError::ConnectTimeout, StatusCategory::Timeout),
            (TransportError::RequestTimeout, StatusCategory::Timeout),
            (TransportError::Connect("refused".into()), StatusCategory::NetworkIssues),
            (TransportError::InvalidRequest("bad".into()), StatusCategory::BadRequest),
        ];
        for (error, category) in cases {
            let mock = Arc::new(MockTransport::new());
            mock.push_error(error.clone());
            let op = probe(&mock, config());

            let failure = execute(&op, None).await.unwrap_err();
            assert_eq!(failure.status.category, category);
            assert!(matches!(failure.error, PulseError::Transport(ref e) if *e == error));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_deadline() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_secs(60)));
        let op = probe(&mock, config());

        let failure = execute(&op, None).await.unwrap_err();
        assert_eq!(failure.status.category, StatusCategory::Timeout);
        assert!(matches!(
            failure.error,
            PulseError::Transport(TransportError::RequestTimeout)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_secs(60)));
        let op = probe(&mock, config());
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                token.cancel();
            })
        };

        let failure = execute(&op, Some(&token)).await.unwrap_err();
        canceller.await.unwrap();
        assert_eq!(failure.status.category, StatusCategory::Cancelled);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_http_error_categories() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(403, r#"{"error":true,"message":"Forbidden","status":403}"#);
        mock.push_response(400, r#"{"status":400,"message":"Invalid Arguments"}"#);
        mock.push_response(502, "Bad Gateway");
        let op = probe(&mock, config());

        let failure = execute(&op, None).await.unwrap_err();
        assert_eq!(failure.status.category, StatusCategory::AccessDenied);
        assert_eq!(failure.status.status_code, 403);
        match failure.error {
            PulseError::ServerReported { message, .. } => assert_eq!(message, "Forbidden"),
            other => panic!("Expected ServerReported error, got {:?}", other),
        }

        let failure = execute(&op, None).await.unwrap_err();
        assert_eq!(failure.status.category, StatusCategory::BadRequest);
        assert!(failure.error.to_string().contains("Invalid Arguments"));

        let failure = execute(&op, None).await.unwrap_err();
        assert_eq!(failure.status.category, StatusCategory::Unknown);
        assert!(failure.error.to_string().contains("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_success_stores_telemetry() {
        let mock = Arc::new(MockTransport::new());
        let op = probe(&mock, config());

        execute(&op, None).await.unwrap();
        assert!(op.context.telemetry().operation_latency().contains_key("l_time"));
    }
}
