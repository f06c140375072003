//! HTTP transport in front of the dispatch engine.
//!
//! The server accepts connections on one listener, collects each request
//! body, and hands a [`RequestContext`](crate::core::RequestContext) to the
//! [`Dispatcher`]. It never waits on worker availability itself; the
//! connection task awaits the dispatch outcome.
//!
//! # Graceful Shutdown
//!
//! Shutdown stops the accept loop and asks every open connection to finish
//! its in-flight request and close.
//!
//! ```rust,ignore
//! server.trigger_shutdown();
//! server.wait_for_drain(Duration::from_secs(30)).await;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                       Server                         │
//! │  accept loop ──▶ connection task (hyper auto)        │
//! │                       │                              │
//! │                       ▼                              │
//! │              ConnectionContext                       │
//! │  • body collection  • request id  • access log       │
//! │                       │                              │
//! │                       ▼                              │
//! │         Dispatcher (worker-thread-N)                 │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod access_log;
pub mod config;
mod connection;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub use config::ServerConfig;
use connection::ConnectionContext;

use crate::dispatch::Dispatcher;

/// HTTP server bound to one address.
pub struct Server {
    config: ServerConfig,
    local_addr: SocketAddr,
    /// Taken by `run`, dropped when the accept loop ends.
    listener: Mutex<Option<TcpListener>>,
    ctx: Arc<ConnectionContext>,
    active_connections: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    shutdown_initiated: AtomicBool,
}

impl Server {
    /// Bind the listener. Port `0` picks a free port, see [`Server::local_addr`].
    pub async fn bind(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.addr).await?;
        let local_addr = listener.local_addr()?;

        let active_connections = Arc::new(AtomicUsize::new(0));
        let ctx = Arc::new(ConnectionContext {
            dispatcher,
            active_connections: Arc::clone(&active_connections),
            request_timeout: config.request_timeout,
            access_log_enabled: config.access_log,
        });

        if config.access_log {
            info!("Access logging enabled (ACCESS_LOG=1)");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            local_addr,
            listener: Mutex::new(Some(listener)),
            ctx,
            active_connections,
            shutdown_tx,
            shutdown_rx,
            shutdown_initiated: AtomicBool::new(false),
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.ctx.dispatcher
    }

    /// Accept connections until shutdown is triggered.
    pub async fn run(&self) -> std::io::Result<()> {
        let Some(listener) = self.listener.lock().take() else {
            return Err(std::io::Error::other("server is already running"));
        };

        info!(
            "Server listening on http://{} (threads: {}, workers: {})",
            self.local_addr,
            self.ctx.dispatcher.thread_count(),
            self.ctx.dispatcher.pool().size()
        );

        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };

                    let _ = stream.set_nodelay(true);

                    let ctx = Arc::clone(&self.ctx);
                    let conn_shutdown = self.shutdown_rx.clone();
                    tokio::spawn(async move {
                        ctx.handle_connection(stream, remote_addr, conn_shutdown).await;
                    });
                }
                _ = shutdown_rx.changed() => {
                    debug!("Received shutdown signal, stopping accept loop");
                    break;
                }
            }
        }

        drop(listener);
        info!("Listener on {} closed", self.local_addr);
        Ok(())
    }

    pub fn trigger_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
    }

    pub fn drain_timeout(&self) -> Duration {
        self.config.drain_timeout
    }

    /// Wait for all active connections to drain.
    /// Returns true if drained successfully, false if timeout was reached.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        let check_interval = Duration::from_millis(100);

        loop {
            let active = self.active_connections.load(Ordering::Relaxed);
            if active == 0 {
                return true;
            }

            if start.elapsed() >= timeout {
                warn!("Drain timeout reached with {} active connections", active);
                return false;
            }

            debug!("Waiting for {} connections to drain...", active);
            tokio::time::sleep(check_interval).await;
        }
    }

    /// Stop the dispatcher. Queued requests still run.
    pub fn shutdown(&self) {
        self.ctx.dispatcher.shutdown();
    }
}
