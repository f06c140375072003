//! Worker registry and construction.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;

use super::{
    properties, DelayWorker, MaxSpeedWorker, MemoryLeakWorker, NormalWorker, PropertyMap,
    SwitchingWorker, Worker,
};
use crate::error::ConstructionError;

/// Namespace bare identifiers resolve against.
pub const DEFAULT_NAMESPACE: &str = "weaver.worker";

/// Prefix of keys that composite workers consume themselves.
const INDEXED_PREFIX: &str = "worker";

/// Builds a worker with default settings.
pub type Constructor = fn() -> Box<dyn Worker>;

/// Static registry mapping qualified identifiers to constructors.
pub struct WorkerFactory {
    namespace: String,
    constructors: HashMap<String, Constructor>,
}

impl WorkerFactory {
    /// Create an empty factory resolving bare identifiers against `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            constructors: HashMap::new(),
        }
    }

    /// Create a factory with all built-in workers registered.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new(DEFAULT_NAMESPACE);
        factory.register("NormalWorker", || Box::new(NormalWorker::default()));
        factory.register("DelayWorker", || Box::new(DelayWorker::default()));
        factory.register("MaxSpeedWorker", || Box::new(MaxSpeedWorker::default()));
        factory.register("MemoryLeakWorker", || Box::new(MemoryLeakWorker::default()));
        factory.register("SwitchingWorker", || Box::new(SwitchingWorker::default()));
        factory
    }

    /// Register a constructor. Bare identifiers are qualified first.
    pub fn register(&mut self, identifier: &str, constructor: Constructor) {
        let qualified = self.qualify(identifier).into_owned();
        self.constructors.insert(qualified, constructor);
    }

    /// Prefix a bare identifier with the default namespace.
    pub fn qualify<'a>(&self, identifier: &'a str) -> Cow<'a, str> {
        if identifier.contains('.') {
            Cow::Borrowed(identifier)
        } else {
            Cow::Owned(format!("{}.{}", self.namespace, identifier))
        }
    }

    pub fn is_registered(&self, identifier: &str) -> bool {
        self.constructors.contains_key(self.qualify(identifier).as_ref())
    }

    /// Construct and configure one worker.
    ///
    /// Properties are applied through the worker's setter table; unknown keys
    /// are tolerated. Map-configurable workers then receive the whole map and
    /// may reject the instance, reported as [`ConstructionError::Rejected`].
    pub fn construct(
        &self,
        identifier: &str,
        properties: &PropertyMap,
    ) -> Result<Box<dyn Worker>, ConstructionError> {
        let qualified = self.qualify(identifier);
        let constructor = self
            .constructors
            .get(qualified.as_ref())
            .ok_or_else(|| ConstructionError::UnknownIdentifier(qualified.to_string()))?;

        let mut worker = constructor();
        let composite = worker.as_map_configurable().is_some();

        for (key, value) in properties.iter() {
            match worker.set_property(key, value) {
                Some(result) => result?,
                None if composite && properties::split_indexed_key(key, INDEXED_PREFIX).is_some() => {}
                None => debug!(
                    worker = worker.name(),
                    property = key,
                    "ignoring unknown property"
                ),
            }
        }

        if let Some(configurable) = worker.as_map_configurable() {
            configurable.configure(properties, self)?;
        }

        Ok(worker)
    }
}

impl Default for WorkerFactory {
    fn default() -> Self {
        Self::with_builtin()
    }
}
