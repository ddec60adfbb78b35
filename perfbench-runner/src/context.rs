//! Execution Context
//!
//! Holds everything one run shares: the meter set, the result tree, and the
//! executor cache keyed by class. Constructing a context starts a run;
//! dropping it ends one, so executor state never leaks between runs.

use crate::element::BenchmarkElement;
use crate::executor::Executor;
use fxhash::FxHashMap;
use perfbench_core::{ClassId, MeterSet};
use perfbench_report::RunResult;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared state of one benchmark run
#[derive(Debug)]
pub struct BenchContext {
    meters: MeterSet,
    result: Arc<Mutex<RunResult>>,
    executors: Mutex<FxHashMap<ClassId, Arc<Executor>>>,
}

impl BenchContext {
    /// Start a run measured by `meters`, with an empty result tree and no executors
    pub fn initialize(meters: MeterSet) -> Self {
        tracing::debug!(meters = ?meters, "initializing benchmark context");
        Self {
            result: Arc::new(Mutex::new(RunResult::new(meters.clone()))),
            meters,
            executors: Mutex::new(FxHashMap::default()),
        }
    }

    /// Registered meters
    pub fn meters(&self) -> &MeterSet {
        &self.meters
    }

    /// Executor for the element's declaring class, created on first request.
    ///
    /// Every element of the same class gets the same executor.
    pub fn get_executor(&self, element: &BenchmarkElement) -> Arc<Executor> {
        let class = element.class().id();
        let mut executors = self
            .executors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        executors
            .entry(class)
            .or_insert_with(|| {
                tracing::debug!(class = %class, "creating executor");
                Arc::new(Executor::new(
                    element,
                    self.meters.clone(),
                    Arc::clone(&self.result),
                ))
            })
            .clone()
    }

    /// Number of executors created so far
    pub fn executor_count(&self) -> usize {
        self.executors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Read the result tree under its lock
    pub fn with_result<R>(&self, f: impl FnOnce(&RunResult) -> R) -> R {
        f(&self.lock_result())
    }

    /// Copy of the result tree as it stands
    pub fn snapshot(&self) -> RunResult {
        self.lock_result().clone()
    }

    /// End the run and take the result tree
    pub fn into_result(self) -> RunResult {
        // Executors hold clones of the result handle
        drop(self.executors);
        match Arc::try_unwrap(self.result) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    fn lock_result(&self) -> MutexGuard<'_, RunResult> {
        self.result.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
