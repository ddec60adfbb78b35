#![warn(missing_docs)]
//! # perfbench
//!
//! Micro-benchmark execution engine with lifecycle hooks and pluggable meters.
//!
//! - **Classes**: benchmarks are methods of a `Default` type, described by `#[bench_class]`
//! - **Lifecycle Hooks**: once-before, each-before, each-after and once-after methods per class
//! - **Meters**: wall-clock time, invocation counter, cycle counter and heap allocations
//! - **Result Tree**: samples indexed by class, then method, with the run's meter set at every level
//! - **Failure Isolation**: hook, benchmark and meter failures are recorded, never abort a run
//!
//! ## Quick Start
//!
//! ```ignore
//! use perfbench::prelude::*;
//!
//! #[derive(Default)]
//! struct Sorting { data: Vec<u64> }
//!
//! #[bench_class(runs = 20)]
//! impl Sorting {
//!     #[before_each_run]
//!     pub fn fill(&mut self) {
//!         self.data = (0..10_000).rev().collect();
//!     }
//!
//!     #[bench]
//!     pub fn sort(&mut self) {
//!         self.data.sort();
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let outcome = perfbench::run(&[perfbench::class::<Sorting>()])?;
//!     println!("{} invocations", outcome.result.invocations());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! `perfbench::run` reads `perfbench.toml` from the current directory or any
//! parent. See [`PerfConfig::default_toml`] for the recognized keys.

use std::sync::Arc;

// Re-export core types
pub use perfbench_core::{
    AllocationMeter, BenchClass, CheckError, ClassDescriptor, ClassId, CountingMeter, CycleMeter,
    HAS_CYCLE_COUNTER, InvocationError, Meter, MeterError, MeterKey, MeterSet, MethodDescriptor,
    MethodError, MethodId, ReturnShape, Role, TimeMeter, TimeUnit, TrackingAllocator, Visibility,
    allocated_bytes, allocation_count, check_method, check_shape, invoke_method,
};

// Re-export macros
pub use perfbench_macros::bench_class;

// Re-export result tree
pub use perfbench_report::{ClassResult, MeterFailure, MethodResult, RecordedFailure, RunResult};

// Re-export runner
pub use perfbench_runner::{
    BenchContext, BenchmarkElement, CONFIG_FILE, ElementError, ElementFailure, Executor,
    LifecycleHooks, MeterConfig, NoopListener, PerfConfig, ProgressListener, RunConfig, RunError,
    RunListener, RunOutcome, Runner, TracingListener, init_tracing,
};

/// Internal re-exports for macro use
#[doc(hidden)]
pub mod internal {
    pub use perfbench_core::{InvokeFailure, ReturnShape, Role, Visibility, downcast_target};
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchClass, ClassDescriptor, Meter, MeterSet, RunConfig, Runner, TimeUnit, bench_class,
    };
}

/// Descriptor of a `#[bench_class]` type
pub fn class<T: BenchClass>() -> &'static ClassDescriptor {
    T::descriptor()
}

/// Run `classes` with the discovered `perfbench.toml` (or defaults).
///
/// Installs the default tracing subscriber and draws a progress bar on stderr.
/// Failures of individual benchmarks are reported in the outcome, not as an
/// error.
///
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     perfbench::run(&[perfbench::class::<Sorting>()])?;
///     Ok(())
/// }
/// ```
pub fn run(classes: &[&'static ClassDescriptor]) -> anyhow::Result<RunOutcome> {
    init_tracing(false);
    let config = PerfConfig::discover().unwrap_or_default();
    tracing::debug!(?config, "loaded configuration");

    let outcome = Runner::from_config(&config)
        .with_listener(Arc::new(ProgressListener::new()))
        .run(classes)?;

    for failure in &outcome.failures {
        tracing::warn!(%failure, "benchmark failed");
    }
    Ok(outcome)
}
