//! Progress Listeners
//!
//! The runner reports progress through [`RunListener`]. Events arrive in
//! order: `run_started`, then `element_started` / `element_failed` per
//! repetition, then `run_finished`. Listeners must not block the run; a
//! listener that cannot deliver an event drops it.

use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;

/// Observer of run progress
pub trait RunListener: Send + Sync {
    /// The run is about to start. `per_element` lists each element id with its repetitions.
    fn run_started(&self, total_runs: u64, per_element: &[(String, u64)]) {
        let _ = (total_runs, per_element);
    }

    /// One repetition of an element is starting
    fn element_started(&self, element: &str) {
        let _ = element;
    }

    /// An element failed (in a hook, the benchmark, or while being built)
    fn element_failed(&self, element: &str, error: &dyn Error) {
        let _ = (element, error);
    }

    /// The run has finished
    fn run_finished(&self) {}
}

/// Listener that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl RunListener for NoopListener {}

/// Listener that logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl RunListener for TracingListener {
    fn run_started(&self, total_runs: u64, per_element: &[(String, u64)]) {
        tracing::info!(total_runs, elements = per_element.len(), "benchmark run started");
    }

    fn element_started(&self, element: &str) {
        tracing::debug!(element, "running");
    }

    fn element_failed(&self, element: &str, error: &dyn Error) {
        tracing::warn!(element, error = %error, "element failed");
    }

    fn run_finished(&self) {
        tracing::info!("benchmark run finished");
    }
}

/// Listener that draws a terminal progress bar
#[derive(Debug)]
pub struct ProgressListener {
    bar: ProgressBar,
}

impl ProgressListener {
    /// Create a hidden bar; it is sized and shown on `run_started`
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// Repetitions reported so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for ProgressListener {
    fn default() -> Self {
        Self::new()
    }
}

impl RunListener for ProgressListener {
    fn run_started(&self, total_runs: u64, _per_element: &[(String, u64)]) {
        self.bar.set_length(total_runs);
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn element_started(&self, element: &str) {
        self.bar.set_message(element.to_string());
        self.bar.inc(1);
    }

    fn element_failed(&self, element: &str, _error: &dyn Error) {
        self.bar.println(format!("failed: {element}"));
    }

    fn run_finished(&self) {
        self.bar.finish_with_message("Complete");
    }
}
