#![warn(missing_docs)]
//! perfbench Runner - Benchmark Execution
//!
//! Turns class descriptors into measured runs:
//! - `BenchmarkElement`: a benchmark method with its resolved lifecycle hooks
//! - `Executor`: per-class once-only latches, hook dispatch and measurement
//! - `BenchContext`: the executor cache and result tree of one run
//! - `Runner`: plans, repeats and optionally parallelizes whole runs
//!
//! Configuration comes from `perfbench.toml`; progress is reported through
//! `RunListener` implementations.

mod config;
mod context;
mod element;
mod executor;
mod listener;
mod planner;
mod runner;

pub use config::{CONFIG_FILE, MeterConfig, PerfConfig, RunConfig};
pub use context::BenchContext;
pub use element::{BenchmarkElement, ElementError, LifecycleHooks};
pub use executor::{Executor, OnceLatch};
pub use listener::{NoopListener, ProgressListener, RunListener, TracingListener};
pub use planner::{ClassPlan, ExecutionPlan, build_plan};
pub use runner::{ElementFailure, RunError, RunOutcome, Runner};

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber for perfbench output.
///
/// `RUST_LOG` wins when set. Otherwise perfbench crates log at `info`, or
/// `debug` when `verbose`. Does nothing if a subscriber is already installed.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "perfbench={level},perfbench_core={level},perfbench_report={level},perfbench_runner={level}"
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
