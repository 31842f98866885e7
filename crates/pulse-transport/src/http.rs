//! HTTP transport implementation backed by `reqwest`.
//!
//! `reqwest` sets the connect timeout per client, so one pooled client is
//! kept per distinct connect timeout. Subscribe and non-subscribe calls use
//! different timeouts and each get their own connection pool.

use crate::traits::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Default idle connections kept per host.
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 8;

/// `reqwest` transport configuration.
#[derive(Debug, Clone)]
pub struct ReqwestConfig {
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Idle connection lifetime.
    pub pool_idle_timeout: Duration,
    /// User agent header.
    pub user_agent: String,
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: pulse_protocol::sdk_identifier(),
        }
    }
}

/// HTTP transport over `reqwest`.
pub struct ReqwestTransport {
    config: ReqwestConfig,
    clients: DashMap<Duration, reqwest::Client>,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ReqwestConfig::default())
    }

    /// Create a transport with custom configuration.
    #[must_use]
    pub fn with_config(config: ReqwestConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    fn client(&self, connect_timeout: Duration) -> Result<reqwest::Client, TransportError> {
        if let Some(client) = self.clients.get(&connect_timeout) {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .pool_idle_timeout(self.config.pool_idle_timeout)
            .user_agent(self.config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        debug!(connect_timeout_ms = connect_timeout.as_millis() as u64, "Created HTTP client");
        Ok(self
            .clients
            .entry(connect_timeout)
            .or_insert(client)
            .clone())
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn map_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() && error.is_connect() {
        TransportError::ConnectTimeout
    } else if error.is_timeout() {
        TransportError::RequestTimeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client(request.connect_timeout)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = client
            .request(method, request.url.as_str())
            .timeout(request.request_timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        trace!(method = %request.method, url = %request.url, "Sending request");
        let response = builder.send().await.map_err(|e| map_error(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_error(&e))?;
        trace!(status, bytes = body.len(), "Received response");

        Ok(HttpResponse { status, body })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes as AxumBytes;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::Router;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn request(addr: SocketAddr, path: &str) -> HttpRequest {
        HttpRequest::get(
            format!("http://{}{}", addr, path),
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_config_default() {
        let config = ReqwestConfig::default();
        assert_eq!(config.pool_max_idle_per_host, 8);
        assert!(config.user_agent.starts_with("Pulse-Rust/"));
    }

    #[tokio::test]
    async fn test_get_and_status() {
        let app = Router::new()
            .route("/time/0", get(|| async { "[15000000000000000]" }))
            .route(
                "/denied",
                get(|| async { (StatusCode::FORBIDDEN, r#"{"error":true}"#) }),
            );
        let addr = serve(app).await;
        let transport = ReqwestTransport::new();

        let response = transport.send(request(addr, "/time/0")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"[15000000000000000]");

        let response = transport.send(request(addr, "/denied")).await.unwrap();
        assert_eq!(response.status, 403);
    }

    #[tokio::test]
    async fn test_post_body() {
        let app = Router::new().route("/echo", post(|body: AxumBytes| async move { body }));
        let addr = serve(app).await;
        let transport = ReqwestTransport::new();

        let mut req = request(addr, "/echo").with_header("Content-Type", "application/json");
        req.method = Method::Post;
        req.body = bytes::Bytes::from_static(b"[1,2,3]");

        let response = transport.send(req).await.unwrap();
        assert_eq!(&response.body[..], b"[1,2,3]");
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = serve(app).await;
        let transport = ReqwestTransport::new();

        let mut req = request(addr, "/slow");
        req.request_timeout = Duration::from_millis(100);
        assert_eq!(
            transport.send(req).await.unwrap_err(),
            TransportError::RequestTimeout
        );
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let transport = ReqwestTransport::new();

        assert!(matches!(
            transport.send(request(addr, "/time/0")).await,
            Err(TransportError::Connect(_))
        ));
    }

    #[tokio::test]
    async fn test_clients_cached_per_connect_timeout() {
        let transport = ReqwestTransport::new();
        transport.client(Duration::from_secs(1)).unwrap();
        transport.client(Duration::from_secs(1)).unwrap();
        transport.client(Duration::from_secs(2)).unwrap();
        assert_eq!(transport.clients.len(), 2);
    }
}
