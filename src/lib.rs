//! weaver - configurable request-dispatch harness.
//!
//! Weaver reads a worker file describing a pool of simulated service
//! behaviors, builds the workers, and serves HTTP requests by handing each
//! one to a worker taken from the pool. It is meant as a test target for
//! load and resilience tooling.
//!
//! # Features
//!
//! - **Worker file**: `3x NormalWorker = statusCode: 201, response: ok`
//! - **Composite workers**: nested `worker<N>_` configuration, any depth
//! - **Exclusive workers**: a worker serves at most one request at a time
//! - **Swallow and recycle**: failing or panicking workers go back to the pool
//! - **HTTP/1.1 and HTTP/2** via hyper, custom reason phrases on HTTP/1
//!
//! # Architecture
//!
//! ```text
//! worker file ─▶ config::parse_line ─▶ WorkerFactory ─▶ WorkerPool
//!                                        ▲      │
//!                         MapConfigurable┘      ▼
//!                 HTTP ─▶ server ─▶ Dispatcher (worker-thread-N)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use weaver::{Server, ServerConfig, Weaver};
//!
//! let mut weaver = Weaver::default();
//! weaver.load_lines(["4x NormalWorker = statusCode: 200, response: hello"]);
//! let dispatcher = Arc::new(weaver.start(0, true)?);
//!
//! let server = Server::bind(ServerConfig::new("127.0.0.1:8080".parse()?), dispatcher).await?;
//! server.run().await?;
//! ```

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod pool;
pub mod server;
pub mod weaver;
pub mod worker;

// Re-exports for convenience
pub use config::Config;
pub use dispatch::Dispatcher;
pub use server::{Server, ServerConfig};
pub use weaver::Weaver;
pub use worker::{Worker, WorkerFactory};
