#![warn(missing_docs)]
//! perfbench Report - Result Tree
//!
//! Measurements are indexed by class, then by method:
//!
//! ```text
//! RunResult ── ClassResult (one per class, first-seen order)
//!                  └── MethodResult (one per method, first-seen order)
//!                          └── samples per meter
//! ```
//!
//! Every level carries the meter set the run was initialized with. Lookups
//! are find-or-create, so repeated invocations append to the same node.

mod class;
mod method;
mod run;

pub use class::ClassResult;
pub use method::{MeterFailure, MethodResult};
pub use run::{RecordedFailure, RunResult};
