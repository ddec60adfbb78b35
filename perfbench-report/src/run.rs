//! Run-level results

use crate::class::ClassResult;
use crate::method::MethodResult;
use fxhash::FxHashMap;
use perfbench_core::{ClassId, MeterKey, MeterSet, MethodError, MethodId, Role};

/// A hook or benchmark failure, attributed to one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    /// Method that failed
    pub method: MethodId,
    /// Role it was run for
    pub role: Role,
    /// Error text
    pub message: String,
}

impl From<&MethodError> for RecordedFailure {
    fn from(error: &MethodError) -> Self {
        Self {
            method: error.method(),
            role: error.role(),
            message: error.to_string(),
        }
    }
}

/// Root of the result tree
#[derive(Debug, Clone)]
pub struct RunResult {
    meters: MeterSet,
    classes: Vec<ClassResult>,
    index: FxHashMap<ClassId, usize>,
    failures: Vec<RecordedFailure>,
}

impl RunResult {
    /// Empty result for a run measured with `meters`
    pub fn new(meters: MeterSet) -> Self {
        Self {
            meters,
            classes: Vec::new(),
            index: FxHashMap::default(),
            failures: Vec::new(),
        }
    }

    /// Registered meters
    pub fn meters(&self) -> &MeterSet {
        &self.meters
    }

    /// Result for `class`, created on first request
    pub fn class_result_mut(&mut self, class: ClassId) -> &mut ClassResult {
        let idx = match self.index.get(&class) {
            Some(&idx) => idx,
            None => {
                let idx = self.classes.len();
                self.classes.push(ClassResult::new(class, self.meters.clone()));
                self.index.insert(class, idx);
                idx
            }
        };
        &mut self.classes[idx]
    }

    /// Result for `method`, creating its class and method nodes as needed
    pub fn method_result_mut(&mut self, method: MethodId) -> &mut MethodResult {
        self.class_result_mut(method.class).method_result_mut(method)
    }

    /// Result for `class`, if any of its methods was benchmarked
    pub fn class_result(&self, class: &ClassId) -> Option<&ClassResult> {
        self.index.get(class).map(|&idx| &self.classes[idx])
    }

    /// Result for `method`, if it was benchmarked
    pub fn method_result(&self, method: &MethodId) -> Option<&MethodResult> {
        self.class_result(&method.class)
            .and_then(|c| c.method_result(method))
    }

    /// Class results in first-seen order
    pub fn class_results(&self) -> &[ClassResult] {
        &self.classes
    }

    /// Record a hook or benchmark failure
    pub fn record_failure(&mut self, failure: RecordedFailure) {
        self.failures.push(failure);
    }

    /// Failures in the order they occurred
    pub fn failures(&self) -> &[RecordedFailure] {
        &self.failures
    }

    /// All samples of one meter across the run
    pub fn samples(&self, meter: &MeterKey) -> Vec<f64> {
        self.classes.iter().flat_map(|c| c.samples(meter)).collect()
    }

    /// Completed invocations across the run
    pub fn invocations(&self) -> u64 {
        self.classes.iter().map(ClassResult::invocations).sum()
    }
}
