//! State shared by every call of a client.

use crate::config::ClientConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tenvis_pulse_core::TelemetryManager;
use tenvis_pulse_transport::HttpTransport;

/// Largest request sequence number before wrapping back to 1.
const MAX_SEQUENCE: u64 = 65_535;

/// Configuration snapshot plus the collaborators every call needs.
pub struct ClientContext {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    telemetry: TelemetryManager,
    sequence: AtomicU64,
    token: RwLock<Option<String>>,
}

impl ClientContext {
    #[must_use]
    pub fn new(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            telemetry: TelemetryManager::new(),
            sequence: AtomicU64::new(0),
            token: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    #[must_use]
    pub fn telemetry(&self) -> &TelemetryManager {
        &self.telemetry
    }

    /// Next request sequence number, cycling through `1..=65535`.
    pub fn next_sequence(&self) -> u64 {
        let previous = self
            .sequence
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n % MAX_SEQUENCE + 1)
            })
            .unwrap_or_default();
        previous % MAX_SEQUENCE + 1
    }

    /// Set the access token sent instead of the auth key.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Authorization value for calls that require it: the token when set,
    /// otherwise the configured auth key.
    #[must_use]
    pub fn auth(&self) -> Option<String> {
        self.token()
            .or_else(|| self.config.auth_key.clone())
            .filter(|a| !a.is_empty())
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("origin", &self.config.origin)
            .field("uuid", &self.config.uuid)
            .field("transport", &self.transport.name())
            .finish()
    }
}
