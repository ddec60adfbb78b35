//! Benchmark Executor
//!
//! One executor per benchmarked class. It owns the class's once-only latches,
//! runs lifecycle hooks, and drives the registered meters around each
//! benchmark invocation.
//!
//! ## Invocation
//!
//! ```text
//! check_method ──► read meters ──► invoke_method ──► read meters
//!                                                        │
//!                      RunResult ◄── lock ◄── samples ◄──┘
//! ```
//!
//! Meter failures are recorded next to the samples and never fail the
//! invocation. Check and invocation failures are recorded in the run result
//! and returned to the caller.

use crate::element::{BenchmarkElement, LifecycleHooks};
use perfbench_core::{
    ClassDescriptor, Meter, MeterError, MeterSet, MethodDescriptor, MethodError, Role,
    check_method, invoke_method, panic_message,
};
use perfbench_report::{MeterFailure, RecordedFailure, RunResult};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Two-state latch: pending, then done. Claiming is an atomic check-and-set.
#[derive(Debug, Default)]
pub struct OnceLatch {
    done: AtomicBool,
}

impl OnceLatch {
    /// A pending latch
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Move from pending to done. Returns `true` for exactly one caller.
    pub fn try_claim(&self) -> bool {
        self.done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the latch has been claimed
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Per-class coordinator of hooks, benchmark invocation and measurement
#[derive(Debug)]
pub struct Executor {
    class: &'static ClassDescriptor,
    hooks: LifecycleHooks,
    before_first_done: OnceLatch,
    after_last_done: OnceLatch,
    meters: MeterSet,
    result: Arc<Mutex<RunResult>>,
}

impl Executor {
    pub(crate) fn new(
        element: &BenchmarkElement,
        meters: MeterSet,
        result: Arc<Mutex<RunResult>>,
    ) -> Self {
        Self {
            class: element.class(),
            hooks: *element.hooks(),
            before_first_done: OnceLatch::new(),
            after_last_done: OnceLatch::new(),
            meters,
            result,
        }
    }

    /// Class this executor serves
    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    /// Whether the before-first-run pass has happened
    pub fn before_first_done(&self) -> bool {
        self.before_first_done.is_done()
    }

    /// Whether the after-last-run pass has happened
    pub fn after_last_done(&self) -> bool {
        self.after_last_done.is_done()
    }

    /// Run the before-first-run hook (first call only) and the before-each-run hook.
    ///
    /// Both hooks are attempted; the first failure is returned.
    pub fn execute_before_methods(&self, instance: &mut dyn Any) -> Result<(), MethodError> {
        let first = if self.before_first_done.try_claim() {
            self.run_hook(instance, self.hooks.before_first_run, Role::BeforeFirstRun)
        } else {
            Ok(())
        };
        let each = self.run_hook(instance, self.hooks.before_each_run, Role::BeforeEachRun);
        first.and(each)
    }

    /// Run the after-last-run hook (first call only) and the after-each-run hook.
    ///
    /// The once-only hook fires on the first call, not the last; callers
    /// invoke this once per benchmarked method lifetime. Both hooks are
    /// attempted; the first failure is returned.
    pub fn execute_after_methods(&self, instance: &mut dyn Any) -> Result<(), MethodError> {
        let last = if self.after_last_done.try_claim() {
            self.run_hook(instance, self.hooks.after_last_run, Role::AfterLastRun)
        } else {
            Ok(())
        };
        let each = self.run_hook(instance, self.hooks.after_each_run, Role::AfterEachRun);
        last.and(each)
    }

    /// Invoke the element's benchmark method once, measured by every meter.
    pub fn execute_bench(
        &self,
        element: &BenchmarkElement,
        instance: &mut dyn Any,
    ) -> Result<(), MethodError> {
        debug_assert_eq!(
            element.class().id(),
            self.class.id(),
            "element executed by another class's executor"
        );
        let method = element.method();

        if let Err(e) = check_method(instance, method, Role::Bench) {
            let error = MethodError::from(e);
            tracing::warn!(error = %error, "benchmark check failed");
            let mut result = self.lock_result();
            result.method_result_mut(method.id()).record_failed_invocation();
            result.record_failure(RecordedFailure::from(&error));
            return Err(error);
        }

        let before: Vec<_> = self.meters.iter().map(|m| read_meter(m.as_ref())).collect();
        let outcome = invoke_method(instance, method, Role::Bench);
        let after: Vec<_> = self.meters.iter().map(|m| read_meter(m.as_ref())).collect();

        let mut samples = Vec::with_capacity(self.meters.len());
        let mut meter_failures = Vec::new();
        for ((meter, start), end) in self.meters.iter().zip(before).zip(after) {
            match start.and_then(|s| end.map(|e| e - s)) {
                Ok(sample) => samples.push((meter.key(), sample)),
                Err(e) => {
                    tracing::warn!(method = %method.id(), error = %e, "meter read failed");
                    meter_failures.push(MeterFailure {
                        meter: meter.key(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let mut result = self.lock_result();
        let node = result.method_result_mut(method.id());
        for failure in meter_failures {
            node.record_meter_failure(failure);
        }

        match outcome {
            Ok(()) => {
                node.record_invocation(samples);
                Ok(())
            }
            Err(e) => {
                node.record_failed_invocation();
                let error = MethodError::from(e);
                tracing::warn!(error = %error, "benchmark invocation failed");
                result.record_failure(RecordedFailure::from(&error));
                Err(error)
            }
        }
    }

    fn run_hook(
        &self,
        instance: &mut dyn Any,
        hook: Option<&'static MethodDescriptor>,
        role: Role,
    ) -> Result<(), MethodError> {
        let Some(hook) = hook else {
            return Ok(());
        };
        tracing::trace!(method = %hook.id(), %role, "running hook");

        check_method(instance, hook, role)
            .map_err(MethodError::from)
            .and_then(|()| invoke_method(instance, hook, role).map_err(MethodError::from))
            .map_err(|e| self.record_error(e))
    }

    fn record_error(&self, error: MethodError) -> MethodError {
        tracing::warn!(error = %error, "method failed");
        self.lock_result().record_failure(RecordedFailure::from(&error));
        error
    }

    fn lock_result(&self) -> MutexGuard<'_, RunResult> {
        self.result.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read a meter, converting a panic into a meter error
fn read_meter(meter: &dyn Meter) -> Result<f64, MeterError> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| meter.value())) {
        Ok(reading) => reading,
        Err(panic) => Err(MeterError::Failed {
            meter: meter.name().to_string(),
            message: panic_message(panic.as_ref()),
        }),
    }
}
