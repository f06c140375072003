//! Logging configuration.

use super::parse::{env_bool, env_opt, env_or};

/// Output format of the log subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One unified JSON object per line.
    Json,
}

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Service name for structured logging.
    pub service_name: String,
    pub format: LogFormat,
    /// Emit one `access` event per dispatched request.
    pub access_log: bool,
}

impl LoggingConfig {
    /// Load configuration from environment variables.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error
    /// RUST_LOG accepts full tracing filter syntax: weaver=debug,hyper=warn
    pub fn from_env() -> Self {
        let format = match env_opt("LOG_FORMAT") {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            filter: Self::resolve_log_filter(),
            service_name: env_or("SERVICE_NAME", "weaver"),
            format,
            access_log: env_bool("ACCESS_LOG", false),
        }
    }

    /// Resolve log filter from environment.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default (info)
    fn resolve_log_filter() -> String {
        if let Some(level) = env_opt("LOG_LEVEL") {
            let level = level.to_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => {
                    return format!("weaver={}", level);
                }
                _ => {
                    // The subscriber is not up yet.
                    eprintln!(
                        "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                        level
                    );
                }
            }
        }

        if let Some(filter) = env_opt("RUST_LOG") {
            return filter;
        }

        "weaver=info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "weaver=info".to_string(),
            service_name: "weaver".to_string(),
            format: LogFormat::Text,
            access_log: false,
        }
    }
}
