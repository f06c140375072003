//! Error taxonomy for configuration, construction and dispatch.
//!
//! Every error here is recovered locally by its caller; none of them
//! aborts initialization or crashes the transport:
//!
//! | Error | Raised by | Recovery |
//! |-------|-----------|----------|
//! | [`ConfigLineError`] | worker file parser | line contributes nothing |
//! | [`ConstructionError`] | [`WorkerFactory`](crate::worker::WorkerFactory) | line contributes nothing |
//! | [`CompositeConfigurationError`] | composite workers | instance is skipped |
//! | [`WorkerError`] | `Worker::work` | logged, worker recycled |
//! | [`DispatchError`] | dispatch engine | transport answers 503/504 |

use std::time::Duration;

use thiserror::Error;

/// A worker configuration line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigLineError {
    #[error("missing '=' between worker declaration and properties")]
    MissingEquals,

    #[error("invalid worker count '{0}'")]
    InvalidCount(String),

    #[error("worker count must be at least 1")]
    ZeroCount,

    #[error("missing worker identifier")]
    MissingIdentifier,

    #[error("malformed property '{0}', expected 'key: value'")]
    MalformedProperty(String),
}

/// A worker instance could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("unknown worker identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("invalid value '{value}' for property '{key}': expected {expected}")]
    InvalidProperty {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("worker rejected its configuration: {0}")]
    Rejected(#[from] CompositeConfigurationError),
}

impl ConstructionError {
    /// Rejections drop a single instance; every other construction error
    /// invalidates the whole configuration line.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ConstructionError::Rejected(_))
    }
}

/// A composite worker could not assemble its delegates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeConfigurationError {
    #[error("no delegate workers configured")]
    NoDelegates,

    #[error("delegate worker no. {index} has no class property")]
    MissingClass { index: u32 },

    #[error("unable to configure delegate workers {failed:?}")]
    DelegatesFailed { failed: Vec<u32> },
}

/// A worker failed while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("response already ended")]
    AlreadyEnded,

    #[error("worker panicked: {0}")]
    Panic(String),

    #[error("{0}")]
    Failed(String),
}

/// The dispatch engine could not deliver a request to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatcher has been shut down")]
    Shutdown,

    #[error("dispatch channel closed unexpectedly")]
    ChannelClosed,

    #[error("request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl DispatchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Timeout(_))
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, DispatchError::Shutdown)
    }
}

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
