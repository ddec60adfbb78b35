//! Method-level results

use fxhash::FxHashMap;
use perfbench_core::{MeterKey, MeterSet, MethodId};

/// A meter that could not be read around one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterFailure {
    /// Meter that failed
    pub meter: MeterKey,
    /// Failure description
    pub message: String,
}

/// Samples collected for one benchmarked method
#[derive(Debug, Clone)]
pub struct MethodResult {
    method: MethodId,
    meters: MeterSet,
    samples: FxHashMap<MeterKey, Vec<f64>>,
    invocations: u64,
    failed_invocations: u64,
    meter_failures: Vec<MeterFailure>,
}

impl MethodResult {
    /// Empty result for `method`
    pub fn new(method: MethodId, meters: MeterSet) -> Self {
        let samples = meters.keys().into_iter().map(|k| (k, Vec::new())).collect();
        Self {
            method,
            meters,
            samples,
            invocations: 0,
            failed_invocations: 0,
            meter_failures: Vec::new(),
        }
    }

    /// Related method
    pub fn method(&self) -> MethodId {
        self.method
    }

    /// Registered meters
    pub fn meters(&self) -> &MeterSet {
        &self.meters
    }

    /// Record a successful invocation and its samples.
    ///
    /// Samples for meters outside the registered set are dropped.
    pub fn record_invocation(&mut self, samples: impl IntoIterator<Item = (MeterKey, f64)>) {
        self.invocations += 1;
        for (key, value) in samples {
            match self.samples.get_mut(&key) {
                Some(values) => values.push(value),
                None => tracing::warn!(
                    method = %self.method,
                    meter = %key,
                    "dropping sample for unregistered meter"
                ),
            }
        }
    }

    /// Record an invocation that raised instead of completing
    pub fn record_failed_invocation(&mut self) {
        self.failed_invocations += 1;
    }

    /// Record a meter that could not be read
    pub fn record_meter_failure(&mut self, failure: MeterFailure) {
        self.meter_failures.push(failure);
    }

    /// Samples of one meter, in collection order
    pub fn samples(&self, meter: &MeterKey) -> &[f64] {
        self.samples.get(meter).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Completed invocations
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Invocations that raised
    pub fn failed_invocations(&self) -> u64 {
        self.failed_invocations
    }

    /// Meter read failures
    pub fn meter_failures(&self) -> &[MeterFailure] {
        &self.meter_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfbench_core::{ClassId, CountingMeter, Meter};
    use std::sync::Arc;

    struct Fixture;

    fn method_id() -> MethodId {
        MethodId {
            class: ClassId::of::<Fixture>("Fixture"),
            name: "bench",
        }
    }

    #[test]
    fn test_record_invocation_appends() {
        let meters = MeterSet::new([Arc::new(CountingMeter::new()) as Arc<dyn Meter>]);
        let key = MeterKey::new("Counter", "ticks");
        let mut result = MethodResult::new(method_id(), meters);

        result.record_invocation([(key.clone(), 1.0)]);
        result.record_invocation([(key.clone(), 1.0)]);
        result.record_failed_invocation();

        assert_eq!(result.samples(&key), &[1.0, 1.0]);
        assert_eq!(result.invocations(), 2);
        assert_eq!(result.failed_invocations(), 1);
    }

    #[test]
    fn test_unregistered_meter_dropped() {
        let mut result = MethodResult::new(method_id(), MeterSet::empty());
        let key = MeterKey::new("Time", "ms");

        result.record_invocation([(key.clone(), 3.0)]);

        assert!(result.samples(&key).is_empty());
        assert_eq!(result.invocations(), 1);
    }
}
