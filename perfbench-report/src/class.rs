//! Class-level results

use crate::method::MethodResult;
use fxhash::FxHashMap;
use perfbench_core::{ClassId, MeterKey, MeterSet, MethodId};

/// Results of all benchmarked methods of one class
#[derive(Debug, Clone)]
pub struct ClassResult {
    class: ClassId,
    meters: MeterSet,
    methods: Vec<MethodResult>,
    index: FxHashMap<MethodId, usize>,
}

impl ClassResult {
    /// Empty result for `class`
    pub fn new(class: ClassId, meters: MeterSet) -> Self {
        Self {
            class,
            meters,
            methods: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Related class
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Registered meters
    pub fn meters(&self) -> &MeterSet {
        &self.meters
    }

    /// Result for `method`, created on first request
    pub fn method_result_mut(&mut self, method: MethodId) -> &mut MethodResult {
        debug_assert_eq!(method.class, self.class, "method filed under a foreign class");

        let idx = match self.index.get(&method) {
            Some(&idx) => idx,
            None => {
                let idx = self.methods.len();
                self.methods.push(MethodResult::new(method, self.meters.clone()));
                self.index.insert(method, idx);
                idx
            }
        };
        &mut self.methods[idx]
    }

    /// Result for `method`, if it was benchmarked
    pub fn method_result(&self, method: &MethodId) -> Option<&MethodResult> {
        self.index.get(method).map(|&idx| &self.methods[idx])
    }

    /// Method results in first-seen order
    pub fn method_results(&self) -> &[MethodResult] {
        &self.methods
    }

    /// All samples of one meter across the class's methods
    pub fn samples(&self, meter: &MeterKey) -> Vec<f64> {
        self.methods
            .iter()
            .flat_map(|m| m.samples(meter).iter().copied())
            .collect()
    }

    /// Completed invocations across the class's methods
    pub fn invocations(&self) -> u64 {
        self.methods.iter().map(MethodResult::invocations).sum()
    }

    /// Failed invocations across the class's methods
    pub fn failed_invocations(&self) -> u64 {
        self.methods.iter().map(MethodResult::failed_invocations).sum()
    }
}
