//! Configuration module for weaver.
//!
//! Process configuration comes from command-line flags with environment
//! fallbacks; logging is configured from the environment only. The worker
//! file grammar lives in [`workers`].
//!
//! # Example
//!
//! ```rust,ignore
//! use clap::Parser;
//! use weaver::config::Config;
//!
//! let config = Config::parse();
//! println!("Listen address: {}", config.listen_addr()?);
//! ```

mod error;
mod logging;
mod parse;
pub mod workers;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use parse::parse_duration;
pub use workers::{parse_line, WorkerSpec};

/// Optional per-request wait limit of the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestTimeout(pub Option<Duration>);

impl RequestTimeout {
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    #[inline]
    pub fn as_duration(&self) -> Option<Duration> {
        self.0
    }
}

impl FromStr for RequestTimeout {
    type Err = String;

    /// Parse duration string (e.g., "30s", "2m", "off").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Self)
    }
}

/// Complete application configuration.
#[derive(Parser, Clone, Debug)]
#[command(
    name = "weaver",
    about = "Serve HTTP requests from a pool of configurable simulated workers",
    disable_help_flag = true
)]
pub struct Config {
    /// Number of dispatch threads, 0 for one per configured worker.
    #[arg(short = 't', long, env = "WEAVER_THREADS", default_value_t = 0)]
    pub threads: usize,

    /// Shuffle the worker pool once at startup.
    #[arg(short = 's', long, env = "WEAVER_SHUFFLE", action = ArgAction::Set, default_value_t = false)]
    pub shuffle: bool,

    /// Worker configuration file.
    #[arg(short = 'c', long = "config", env = "WEAVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print usage.
    #[arg(long, action = ArgAction::SetTrue)]
    pub help: bool,

    /// Listen port.
    #[arg(short = 'p', long, env = "WEAVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Listen host.
    #[arg(short = 'h', long, env = "WEAVER_HOST", default_value = "localhost")]
    pub host: String,

    /// Stop waiting for a worker after this long and answer 504 ("off" to wait forever).
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "off")]
    pub timeout: RequestTimeout,

    /// Seconds to wait for open connections on shutdown.
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 30)]
    pub drain_timeout_secs: u64,

    #[arg(skip = LoggingConfig::from_env())]
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve `host:port` through the system resolver.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let resolve_error = |reason: String| ConfigError::Resolve {
            addr: format!("{}:{}", self.host, self.port),
            reason,
        };

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| resolve_error(e.to_string()))?
            .next()
            .ok_or_else(|| resolve_error("no addresses found".to_string()))
    }

    #[inline]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}:{}", self.host, self.port);
        if let Some(ref path) = self.config {
            info!("  Worker file: {}", path.display());
        }
        if self.threads == 0 {
            info!("  Threads: auto");
        } else {
            info!("  Threads: {}", self.threads);
        }
        info!("  Shuffle: {}", self.shuffle);

        match self.timeout.as_duration() {
            Some(timeout) => info!("  Request timeout: {}ms", timeout.as_millis()),
            None => info!("  Request timeout: disabled"),
        }

        if self.logging.access_log {
            info!("  Access log: enabled");
        }
    }
}
