//! Startup: worker file to running dispatcher.
//!
//! Each configuration line is expanded into `count` workers by the
//! [`WorkerFactory`] and admitted to the shared [`WorkerPool`]. The sum of
//! the counts of all lines that constructed sizes the dispatcher, so a line
//! whose composite instances were rejected still contributes its slots.

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{parse_line, ConfigError, WorkerSpec};
use crate::dispatch::Dispatcher;
use crate::pool::WorkerPool;
use crate::worker::WorkerFactory;

/// Dispatch thread count derived from a request and the configured slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSizing {
    pub requested: usize,
    pub available: usize,
    pub threads: usize,
}

impl ThreadSizing {
    /// Whether the request exceeded the available slots.
    pub fn clamped(&self) -> bool {
        self.requested > self.available
    }
}

/// Resolve the thread count: `0` or anything above `available` means
/// `available`. At least one thread always runs.
pub fn resolve_threads(requested: usize, available: usize) -> ThreadSizing {
    let threads = if requested == 0 || requested > available {
        available
    } else {
        requested
    };

    ThreadSizing {
        requested,
        available,
        threads: threads.max(1),
    }
}

/// Builds the worker pool from configuration lines.
pub struct Weaver {
    factory: WorkerFactory,
    pool: Arc<WorkerPool>,
    slots: usize,
}

impl Weaver {
    pub fn new(factory: WorkerFactory) -> Self {
        Self {
            factory,
            pool: Arc::new(WorkerPool::new()),
            slots: 0,
        }
    }

    /// Load a worker file.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        Ok(self.load_lines(content.lines()))
    }

    /// Load lines, returning the slots they contributed.
    pub fn load_lines<I, S>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .map(|line| self.load_line(line.as_ref()))
            .sum()
    }

    /// Load one line, returning its slot contribution.
    ///
    /// Parse errors and construction errors make the line contribute no
    /// workers and no slots. A composite that rejects its configuration is
    /// skipped alone while the line keeps its full count of slots.
    pub fn load_line(&mut self, line: &str) -> usize {
        let slots = match parse_line(line) {
            Ok(None) => return 0,
            Ok(Some(spec)) => self.summon(&spec, line),
            Err(e) => {
                error!(error = %e, "Unable to parse line '{}'", line.trim());
                0
            }
        };
        self.slots += slots;
        slots
    }

    fn summon(&self, spec: &WorkerSpec, line: &str) -> usize {
        let identifier = self.factory.qualify(&spec.identifier);
        info!(
            "Summoning {} instances of {} with properties {}",
            spec.count, identifier, spec.properties
        );

        let mut built = Vec::with_capacity(spec.count);
        for _ in 0..spec.count {
            match self.factory.construct(&spec.identifier, &spec.properties) {
                Ok(worker) => built.push(worker),
                Err(e) if e.is_rejection() => {
                    warn!(error = %e, "Bad configuration. Skipping worker {}", identifier);
                }
                Err(e) => {
                    error!(error = %e, "Unable to parse line '{}'", line.trim());
                    return 0;
                }
            }
        }

        for worker in built {
            self.pool.admit(worker);
        }
        spec.count
    }

    /// Total slots contributed by all loaded lines.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Size the executor, optionally shuffle the pool, and start dispatching.
    pub fn start(self, requested_threads: usize, shuffle: bool) -> io::Result<Dispatcher> {
        let sizing = resolve_threads(requested_threads, self.slots);
        if sizing.clamped() {
            warn!(
                "Maximum possible threads is {}, while you requested {}. Using {}.",
                sizing.available, sizing.requested, sizing.threads
            );
        }

        if shuffle {
            info!("Shuffling workers...");
            self.pool.shuffle(&mut rand::rng());
        }

        info!("Creating executor with {} threads.", sizing.threads);
        Dispatcher::new(self.pool, sizing.threads)
    }
}

impl Default for Weaver {
    fn default() -> Self {
        Self::new(WorkerFactory::with_builtin())
    }
}
