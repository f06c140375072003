//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::Config;

/// Transport settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Stop waiting for a worker after this long and answer 504.
    pub request_timeout: Option<Duration>,
    pub drain_timeout: Duration,
    /// Emit one access event per request.
    pub access_log: bool,
}

impl ServerConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            request_timeout: None,
            drain_timeout: Duration::from_secs(30),
            access_log: false,
        }
    }

    /// Derive transport settings from the process configuration.
    pub fn from_config(config: &Config, addr: SocketAddr) -> Self {
        Self {
            addr,
            request_timeout: config.timeout.as_duration(),
            drain_timeout: config.drain_timeout(),
            access_log: config.logging.access_log,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}
