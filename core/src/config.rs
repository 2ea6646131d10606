//! Service configuration.
//!
//! Configuration values should be provided by the deployment, not
//! hardcoded; everything here has a sensible default (API on 8080,
//! updates on 4242, `admin`/`admin`).

use crate::auth::StaticCredentials;
use crate::broadcaster::DEFAULT_QUEUE_CAPACITY;
use std::net::SocketAddr;

const DEFAULT_API_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_UPDATES_ADDR: &str = "0.0.0.0:4242";

/// Process-wide configuration for both listeners and the auth gate.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the REST API listens on.
    pub api_addr: SocketAddr,
    /// Address the WebSocket updates endpoint listens on.
    pub updates_addr: SocketAddr,
    /// Static credential pair required for protected operations.
    pub credentials: StaticCredentials,
    /// Capacity of each subscriber's outbound event queue.
    pub subscriber_queue_capacity: usize,
}

impl ServiceConfig {
    /// Creates a configuration with default addresses and credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the REST API listen address.
    #[must_use]
    pub const fn with_api_addr(mut self, addr: SocketAddr) -> Self {
        self.api_addr = addr;
        self
    }

    /// Sets the updates listen address.
    #[must_use]
    pub const fn with_updates_addr(mut self, addr: SocketAddr) -> Self {
        self.updates_addr = addr;
        self
    }

    /// Sets the credential pair for protected operations.
    #[must_use]
    pub fn with_credentials(mut self, credentials: StaticCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the per-subscriber queue capacity.
    #[must_use]
    pub const fn with_subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity;
        self
    }

    /// Builds a configuration from environment variables.
    ///
    /// Recognized variables: `TODO_RELAY_API_ADDR`,
    /// `TODO_RELAY_UPDATES_ADDR`, `TODO_RELAY_USERNAME`,
    /// `TODO_RELAY_PASSWORD`. Absent or unparsable values keep their
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env_parse("TODO_RELAY_API_ADDR") {
            config.api_addr = addr;
        }
        if let Some(addr) = env_parse("TODO_RELAY_UPDATES_ADDR") {
            config.updates_addr = addr;
        }

        let username = std::env::var("TODO_RELAY_USERNAME").ok();
        let password = std::env::var("TODO_RELAY_PASSWORD").ok();
        if let (Some(username), Some(password)) = (username, password) {
            config.credentials = StaticCredentials::new(username, password);
        }

        config
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_addr: parse_default(DEFAULT_API_ADDR),
            updates_addr: parse_default(DEFAULT_UPDATES_ADDR),
            credentials: StaticCredentials::default(),
            subscriber_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

fn env_parse(key: &str) -> Option<SocketAddr> {
    std::env::var(key).ok()?.parse().ok()
}

fn parse_default(addr: &str) -> SocketAddr {
    // Both defaults are literal, well-formed addresses.
    addr.parse().unwrap_or_else(|_| {
        SocketAddr::from(([0, 0, 0, 0], 8080))
    })
}
