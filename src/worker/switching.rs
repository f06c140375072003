use std::any::Any;

use tracing::error;

use super::{properties, MapConfigurable, PropertyMap, Worker, WorkerFactory};
use crate::core::RequestContext;
use crate::error::{CompositeConfigurationError, ConstructionError, WorkerError};

/// Key prefix of delegate configuration (`worker<N>_<key>`).
const DELEGATE_PREFIX: &str = "worker";

/// Composite worker that periodically switches between delegates.
///
/// Delegates are configured inline with indexed keys:
///
/// ```text
/// 1x SwitchingWorker = switchPeriod: 5, worker0_class: NormalWorker, worker1_class: DelayWorker, worker1_delay: 100
/// ```
///
/// Each call forwards to delegate `counter mod switchPeriod mod delegates`.
/// Unless `switchPeriod` is a multiple of the delegate count the cadence is
/// not a plain round robin: with 5 and 3 it runs `0,1,2,0,1` and repeats.
pub struct SwitchingWorker {
    delegates: Vec<Box<dyn Worker>>,
    counter: usize,
    switch_period: usize,
}

impl Default for SwitchingWorker {
    fn default() -> Self {
        Self {
            delegates: Vec::new(),
            counter: 0,
            switch_period: 1000,
        }
    }
}

impl SwitchingWorker {
    pub fn switch_period(&self) -> usize {
        self.switch_period
    }

    pub fn delegates(&self) -> &[Box<dyn Worker>] {
        &self.delegates
    }

    /// Advance the counter and pick the next delegate index.
    pub fn select_delegate(&mut self) -> Option<usize> {
        if self.delegates.is_empty() {
            return None;
        }
        let tick = self.counter;
        self.counter = self.counter.wrapping_add(1);
        Some(tick % self.switch_period % self.delegates.len())
    }
}

impl Worker for SwitchingWorker {
    fn work(&mut self, ctx: &mut RequestContext) -> Result<(), WorkerError> {
        match self.select_delegate() {
            Some(index) => self.delegates[index].work(ctx),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "SwitchingWorker"
    }

    fn set_property(&mut self, key: &str, value: &str) -> Option<Result<(), ConstructionError>> {
        match key {
            "switchPeriod" => {
                Some(properties::positive_int(key, value).map(|v| self.switch_period = v))
            }
            _ => None,
        }
    }

    fn as_map_configurable(&mut self) -> Option<&mut dyn MapConfigurable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl MapConfigurable for SwitchingWorker {
    fn configure(
        &mut self,
        properties: &PropertyMap,
        factory: &WorkerFactory,
    ) -> Result<(), CompositeConfigurationError> {
        let mut failed = Vec::new();

        for (index, delegate_properties) in properties.indexed_groups(DELEGATE_PREFIX) {
            let Some(class) = delegate_properties.get("class") else {
                let err = CompositeConfigurationError::MissingClass { index };
                error!(error = %err, "Unable to configure underlying worker no. {}", index);
                failed.push(index);
                continue;
            };

            match factory.construct(class, &delegate_properties) {
                Ok(worker) => self.delegates.push(worker),
                Err(e) => {
                    error!(error = %e, "Unable to configure underlying worker no. {}", index);
                    failed.push(index);
                }
            }
        }

        if !failed.is_empty() {
            return Err(CompositeConfigurationError::DelegatesFailed { failed });
        }
        if self.delegates.is_empty() {
            return Err(CompositeConfigurationError::NoDelegates);
        }
        Ok(())
    }
}
