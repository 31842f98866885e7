//! Client configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (PULSE_*)
//! - TOML configuration file
//! - Code, through the builder-style setters
//!
//! A client takes a snapshot of its configuration when it is built; later
//! changes to the value it was built from are not observed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tenvis_pulse_core::ListenerOptions;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Key for subscribe and presence calls.
    #[serde(default = "default_subscribe_key")]
    pub subscribe_key: String,

    /// Key for publish and signal calls.
    #[serde(default = "default_publish_key")]
    pub publish_key: String,

    /// Key for signing access-manager calls.
    #[serde(default = "default_secret_key")]
    pub secret_key: Option<String>,

    /// Auth key sent with calls that require authorization.
    #[serde(default = "default_auth_key")]
    pub auth_key: Option<String>,

    /// Device identifier.
    #[serde(default = "default_uuid")]
    pub uuid: String,

    /// Service host name.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Use HTTPS.
    #[serde(default = "default_true")]
    pub secure: bool,

    /// Server-side filter applied to subscribe messages.
    #[serde(default)]
    pub filter_expression: Option<String>,

    /// Seconds without a heartbeat before the service times a device out.
    #[serde(default = "default_presence_timeout")]
    pub presence_timeout: u32,

    /// Request timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Listener channel configuration.
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Report request latencies back to the service.
    #[serde(default = "default_true")]
    pub telemetry: bool,
}

/// Timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Request timeout of non-subscribe calls in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_ms: u64,

    /// Request timeout of subscribe long-polls in milliseconds.
    #[serde(default = "default_subscribe_timeout")]
    pub subscribe_ms: u64,
}

/// Listener channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Events queued per kind before delivery waits. Zero means rendezvous.
    #[serde(default)]
    pub buffer_size: usize,
}

// Default value functions
fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn default_subscribe_key() -> String {
    env("PULSE_SUBSCRIBE_KEY").unwrap_or_default()
}

fn default_publish_key() -> String {
    env("PULSE_PUBLISH_KEY").unwrap_or_default()
}

fn default_secret_key() -> Option<String> {
    env("PULSE_SECRET_KEY")
}

fn default_auth_key() -> Option<String> {
    env("PULSE_AUTH_KEY")
}

fn default_uuid() -> String {
    env("PULSE_UUID").unwrap_or_else(|| format!("pn-{}", uuid::Uuid::new_v4()))
}

fn default_origin() -> String {
    env("PULSE_ORIGIN").unwrap_or_else(|| "ps.pndsn.com".to_string())
}

fn default_true() -> bool {
    true
}

fn default_presence_timeout() -> u32 {
    300
}

fn default_connect_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_request_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_subscribe_timeout() -> u64 {
    310_000 // 310 seconds, longer than the server's long-poll window
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            subscribe_key: default_subscribe_key(),
            publish_key: default_publish_key(),
            secret_key: default_secret_key(),
            auth_key: default_auth_key(),
            uuid: default_uuid(),
            origin: default_origin(),
            secure: true,
            filter_expression: None,
            presence_timeout: default_presence_timeout(),
            timeouts: TimeoutConfig::default(),
            listener: ListenerConfig::default(),
            telemetry: true,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            request_ms: default_request_timeout(),
            subscribe_ms: default_subscribe_timeout(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the given keys and defaults otherwise.
    #[must_use]
    pub fn new(subscribe_key: impl Into<String>, publish_key: impl Into<String>) -> Self {
        Self {
            subscribe_key: subscribe_key.into(),
            publish_key: publish_key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    #[must_use]
    pub fn with_auth_key(mut self, auth_key: impl Into<String>) -> Self {
        self.auth_key = Some(auth_key.into());
        self
    }

    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>, secure: bool) -> Self {
        self.origin = origin.into();
        self.secure = secure;
        self
    }

    /// Load configuration from the first default path that exists, or
    /// defaults with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "pulse.toml",
            "/etc/pulse/pulse.toml",
            "~/.config/pulse/pulse.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// `https` or `http`.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.connect_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request_ms)
    }

    #[must_use]
    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.subscribe_ms)
    }

    /// Options for listeners created by the client.
    #[must_use]
    pub fn listener_options(&self) -> ListenerOptions {
        ListenerOptions {
            buffer_size: self.listener.buffer_size,
        }
    }
}
