//! Workers: stateful units that answer one request at a time.
//!
//! A worker is built by the [`WorkerFactory`] from an identifier and a
//! [`PropertyMap`]. Simple workers expose their settings through
//! [`Worker::set_property`], a per-type table of typed setters. Composite
//! workers additionally implement [`MapConfigurable`] and receive the whole
//! property map to build their own delegates.
//!
//! # Built-in Workers
//!
//! | Worker | Behavior |
//! |--------|----------|
//! | [`NormalWorker`] | Fixed status, message and body, optional request mirroring |
//! | [`DelayWorker`] | Sleeps before answering like `NormalWorker` |
//! | [`MaxSpeedWorker`] | Answers `badCode` when called faster than `maxSpeed` per second |
//! | [`MemoryLeakWorker`] | Stores every request body in a register that never dedupes keys |
//! | [`SwitchingWorker`] | Periodically switches between nested delegate workers |

mod delay;
mod factory;
mod max_speed;
mod memory_leak;
mod normal;
pub mod properties;
mod switching;

use std::any::Any;

pub use delay::DelayWorker;
pub use factory::{Constructor, WorkerFactory, DEFAULT_NAMESPACE};
pub use max_speed::MaxSpeedWorker;
pub use memory_leak::MemoryLeakWorker;
pub use normal::NormalWorker;
pub use properties::PropertyMap;
pub use switching::SwitchingWorker;

use crate::core::RequestContext;
use crate::error::{CompositeConfigurationError, ConstructionError, WorkerError};

/// A simulated service behavior.
///
/// The pool guarantees that a worker is held by at most one request at a
/// time, so `work` takes `&mut self` and needs no locking of its own.
pub trait Worker: Send + 'static {
    /// Handle one request.
    fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError>;

    /// Short type name for logging.
    fn name(&self) -> &'static str;

    /// Apply one configuration property.
    ///
    /// Returns `None` when `key` is not a property of this worker.
    fn set_property(&mut self, _key: &str, _value: &str) -> Option<Result<(), ConstructionError>> {
        None
    }

    /// Optional map-configurable capability.
    fn as_map_configurable(&mut self) -> Option<&mut dyn MapConfigurable> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Worker {
    /// Downcast to a concrete worker type.
    pub fn downcast_ref<T: Worker>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Capability of workers that configure themselves from the raw property map.
pub trait MapConfigurable {
    /// Configure from the full property map of the enclosing configuration.
    ///
    /// `Ok` means the worker is usable and may join the pool; `Err` rejects
    /// this instance.
    fn configure(
        &mut self,
        properties: &PropertyMap,
        factory: &WorkerFactory,
    ) -> Result<(), CompositeConfigurationError>;
}
