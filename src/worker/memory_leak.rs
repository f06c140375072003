use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{NormalWorker, Worker};
use crate::core::RequestContext;
use crate::error::{ConstructionError, WorkerError};

const DEFAULT_REGISTER: &str = "defaultRegister";

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(0);

/// Register key with identity equality.
///
/// Two keys built from the same name never compare equal, so every insert
/// adds a new entry and the register grows without bound.
#[derive(Debug, PartialEq, Eq, Hash)]
struct BadKey {
    name: String,
    id: u64,
}

impl BadKey {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// [`NormalWorker`] that leaks every request body into an in-memory register.
///
/// The register name comes from the request header named by `keyHeader`
/// (default `register`), falling back to `defaultRegister`.
#[derive(Debug)]
pub struct MemoryLeakWorker {
    inner: NormalWorker,
    key_header: String,
    register: HashMap<BadKey, String>,
}

impl Default for MemoryLeakWorker {
    fn default() -> Self {
        Self {
            inner: NormalWorker::default(),
            key_header: "register".to_string(),
            register: HashMap::new(),
        }
    }
}

impl MemoryLeakWorker {
    pub fn key_header(&self) -> &str {
        &self.key_header
    }

    /// Number of stored bodies.
    pub fn register_len(&self) -> usize {
        self.register.len()
    }

    /// Number of stored bodies under the given register name.
    pub fn register_count(&self, name: &str) -> usize {
        self.register.keys().filter(|k| k.name == name).count()
    }
}

impl Worker for MemoryLeakWorker {
    fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
        self.inner.respond(ctx)?;

        let name = ctx
            .request()
            .header(&self.key_header)
            .unwrap_or(DEFAULT_REGISTER);
        let key = BadKey::new(name);
        let body = ctx.request().body_str().into_owned();
        self.register.insert(key, body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MemoryLeakWorker"
    }

    fn set_property(&mut self, key: &str, value: &str) -> Option<Result<(), ConstructionError>> {
        match key {
            "keyHeader" => {
                self.key_header = value.to_string();
                Some(Ok(()))
            }
            _ => self.inner.apply(key, value),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
