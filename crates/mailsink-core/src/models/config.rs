/// Configuration models
use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailsinkConfig {
    pub api_bind_addr: String,
    /// Hostname used for the `nobody@<hostname>` envelope sender
    pub hostname: String,
    /// Prefix for every HTTP route, empty or `/something`
    #[serde(default)]
    pub web_path: String,
    #[serde(default)]
    pub cors_origin: Option<String>,
    pub keepalive_secs: u64,
    /// Capacity of the ingestion queue and of each router sink queue
    pub queue_bound: usize,
    pub subscriber_buffer: usize,
    pub write_timeout_ms: u64,
    pub ping_secs: u64,
    pub relay_timeout_secs: u64,
    /// JSON file of pre-configured relay profiles
    #[serde(default)]
    pub outgoing_smtp: Option<PathBuf>,
}

impl Default for MailsinkConfig {
    fn default() -> Self {
        Self {
            api_bind_addr: DEFAULT_API_BIND_ADDR.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            web_path: String::new(),
            cors_origin: None,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
            queue_bound: DEFAULT_QUEUE_BOUND,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            ping_secs: DEFAULT_PING_SECS,
            relay_timeout_secs: DEFAULT_RELAY_TIMEOUT_SECS,
            outgoing_smtp: None,
        }
    }
}

impl MailsinkConfig {
    /// Validates configuration is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.hostname.trim().is_empty() {
            return Err("Hostname must not be empty".to_string());
        }

        if self.api_bind_addr.trim().is_empty() {
            return Err("API bind address must not be empty".to_string());
        }

        // Web path is joined in front of absolute routes
        if !self.web_path.is_empty()
            && (!self.web_path.starts_with('/') || self.web_path.ends_with('/'))
        {
            return Err(format!(
                "Invalid web path '{}': must start with '/' and not end with '/'",
                self.web_path
            ));
        }

        if self.keepalive_secs == 0 {
            return Err("Keepalive interval must be > 0".to_string());
        }

        if self.queue_bound == 0 || self.subscriber_buffer == 0 {
            return Err("Queue bounds must be > 0".to_string());
        }

        if self.write_timeout_ms == 0 || self.ping_secs == 0 || self.relay_timeout_secs == 0 {
            return Err("Timeouts must be > 0".to_string());
        }

        Ok(())
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    /// Envelope sender for released messages
    pub fn release_sender(&self) -> String {
        format!("{}@{}", RELEASE_SENDER_LOCAL_PART, self.hostname)
    }
}
