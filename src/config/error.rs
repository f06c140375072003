//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The worker configuration file does not exist.
    #[error("The specified configuration file '{}' does not exist.", .path.display())]
    NotFound { path: PathBuf },

    /// The worker configuration file could not be read.
    #[error("IO error for '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The listen host did not resolve to any address.
    #[error("unable to resolve listen address '{addr}': {reason}")]
    Resolve { addr: String, reason: String },
}
