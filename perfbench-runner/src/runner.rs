//! Benchmark Runner
//!
//! Drives a full run over a set of classes:
//!
//! ```text
//! ClassDescriptor ──► BenchmarkElement ──► planner ──► per class:
//!                                                       instance
//!                                                       for each element × runs:
//!                                                         before ─► bench ─► after
//! ```
//!
//! One instance is created per class. A failing before-hook skips the
//! benchmark for that repetition; after-hooks still run. Failures are
//! reported to the listener and collected, never abort the run.

use crate::config::{PerfConfig, RunConfig};
use crate::context::BenchContext;
use crate::element::{BenchmarkElement, ElementError};
use crate::listener::{NoopListener, RunListener};
use crate::planner::{ClassPlan, build_plan};
use perfbench_core::{ClassDescriptor, MeterSet, MethodError};
use perfbench_report::RunResult;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors that prevent a run from starting
#[derive(Debug, Error)]
pub enum RunError {
    /// The element filter is not a valid regex.
    #[error("invalid filter pattern: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// The worker pool for a parallel run could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A failure attributed to one element
#[derive(Debug, Clone, Error)]
pub enum ElementFailure {
    /// The element could not be built and was not run.
    #[error("{element}: {source}")]
    Invalid {
        /// Element id
        element: String,
        /// Why it was rejected
        #[source]
        source: ElementError,
    },

    /// A hook or the benchmark failed during a repetition.
    #[error("{element}: {source}")]
    Failed {
        /// Element id
        element: String,
        /// The method failure
        #[source]
        source: MethodError,
    },
}

impl ElementFailure {
    /// Id of the failed element
    pub fn element(&self) -> &str {
        match self {
            ElementFailure::Invalid { element, .. } | ElementFailure::Failed { element, .. } => {
                element
            }
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The result tree
    pub result: RunResult,
    /// Failures in the order they were observed (per class when parallel)
    pub failures: Vec<ElementFailure>,
}

/// Drives benchmark runs
pub struct Runner {
    config: RunConfig,
    meters: MeterSet,
    listener: Arc<dyn RunListener>,
}

impl Runner {
    /// Runner with explicit settings and meters
    pub fn new(config: RunConfig, meters: MeterSet) -> Self {
        Self {
            config,
            meters,
            listener: Arc::new(NoopListener),
        }
    }

    /// Runner configured from a loaded `perfbench.toml`
    pub fn from_config(config: &PerfConfig) -> Self {
        Self::new(config.runner.clone(), config.meters.build())
    }

    /// Report progress to `listener`
    pub fn with_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Meters used for each run
    pub fn meters(&self) -> &MeterSet {
        &self.meters
    }

    /// Run every benchmark of `classes`
    pub fn run(&self, classes: &[&'static ClassDescriptor]) -> Result<RunOutcome, RunError> {
        let filter = self.config.filter.as_deref().map(Regex::new).transpose()?;
        let started = Instant::now();

        let mut failures = Vec::new();
        let mut elements = Vec::new();
        for &class in classes {
            for method in class.methods().iter().filter(|m| class.is_benchmark(m)) {
                match BenchmarkElement::from_method(class, method) {
                    Ok(element) => elements.push(element),
                    Err(source) => {
                        let element = method.id().to_string();
                        if filter.as_ref().is_some_and(|re| !re.is_match(&element)) {
                            continue;
                        }
                        failures.push(ElementFailure::Invalid { element, source });
                    }
                }
            }
        }

        let plan = build_plan(elements, filter.as_ref());
        let per_element: Vec<(String, u64)> = plan
            .elements()
            .map(|e| (e.id(), u64::from(self.runs_for(e))))
            .collect();
        let total_runs = per_element.iter().map(|(_, runs)| runs).sum();
        self.listener.run_started(total_runs, &per_element);
        for failure in &failures {
            if let ElementFailure::Invalid { element, source } = failure {
                self.listener.element_failed(element, source);
            }
        }

        let ctx = BenchContext::initialize(self.meters.clone());
        let class_failures: Vec<ElementFailure> = if self.config.parallel {
            let run_all = || {
                plan.classes
                    .par_iter()
                    .flat_map_iter(|class| self.run_class(&ctx, class))
                    .collect::<Vec<_>>()
            };
            if self.config.threads > 0 {
                ThreadPoolBuilder::new()
                    .num_threads(self.config.threads)
                    .build()?
                    .install(run_all)
            } else {
                run_all()
            }
        } else {
            plan.classes
                .iter()
                .flat_map(|class| self.run_class(&ctx, class))
                .collect()
        };
        failures.extend(class_failures);

        let result = ctx.into_result();
        self.listener.run_finished();
        tracing::info!(
            classes = result.class_results().len(),
            invocations = result.invocations(),
            failures = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run complete"
        );

        Ok(RunOutcome { result, failures })
    }

    fn runs_for(&self, element: &BenchmarkElement) -> u32 {
        element.runs().unwrap_or(self.config.runs)
    }

    fn run_class(&self, ctx: &BenchContext, plan: &ClassPlan) -> Vec<ElementFailure> {
        let mut instance = plan.class.instantiate();
        let mut failures = Vec::new();

        for element in &plan.elements {
            let executor = ctx.get_executor(element);
            let id = element.id();

            for _ in 0..self.runs_for(element) {
                self.listener.element_started(&id);
                let mut errors = Vec::new();

                match executor.execute_before_methods(instance.as_mut()) {
                    Ok(()) => {
                        if let Err(e) = executor.execute_bench(element, instance.as_mut()) {
                            errors.push(e);
                        }
                    }
                    Err(e) => errors.push(e),
                }
                if let Err(e) = executor.execute_after_methods(instance.as_mut()) {
                    errors.push(e);
                }

                for source in errors {
                    self.listener.element_failed(&id, &source);
                    failures.push(ElementFailure::Failed {
                        element: id.clone(),
                        source,
                    });
                }
            }
        }

        failures
    }
}
