//! Meters
//!
//! A meter is a measurement instrument read before and after a benchmark
//! invocation; the difference of the two readings is the sample. Meters are
//! shared read-only across a run, so every reading goes through `&self`.

use crate::allocator::{allocated_bytes, is_installed};
use crate::measure::{ClockOrigin, HAS_CYCLE_COUNTER, read_cycles};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors from reading a meter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MeterError {
    /// The meter cannot produce readings on this platform or configuration.
    #[error("meter `{meter}` unavailable: {reason}")]
    Unavailable {
        /// Name of the meter
        meter: String,
        /// Why it cannot be read
        reason: String,
    },

    /// A reading was attempted and failed.
    #[error("meter `{meter}` failed: {message}")]
    Failed {
        /// Name of the meter
        meter: String,
        /// Failure description
        message: String,
    },
}

/// Identity of a meter: name plus unit.
///
/// Two meters with the same key are the same instrument for registration
/// purposes, regardless of the values they have produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeterKey {
    /// Meter name (e.g. "Time")
    pub name: String,
    /// Unit abbreviation (e.g. "ms")
    pub unit: String,
}

impl MeterKey {
    /// Create a key
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for MeterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.unit)
    }
}

/// A pluggable measurement instrument
pub trait Meter: Send + Sync + fmt::Debug {
    /// Meter name
    fn name(&self) -> &str;

    /// Unit abbreviation
    fn unit(&self) -> &str;

    /// Human-readable unit description
    fn unit_description(&self) -> &str;

    /// Take a reading. Samples are differences between two readings.
    fn value(&self) -> Result<f64, MeterError>;

    /// Registration identity of this meter
    fn key(&self) -> MeterKey {
        MeterKey::new(self.name(), self.unit())
    }
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// Unit for `TimeMeter` readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeUnit {
    /// Nanoseconds
    Nanoseconds,
    /// Microseconds
    Microseconds,
    /// Milliseconds
    #[default]
    Milliseconds,
    /// Seconds
    Seconds,
    /// Minutes
    Minutes,
}

impl TimeUnit {
    /// Unit abbreviation
    pub fn abbreviation(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
        }
    }

    /// Long unit name
    pub fn description(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
        }
    }

    /// Nanoseconds per one of this unit
    pub fn nanos_per_unit(self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1.0,
            TimeUnit::Microseconds => 1_000.0,
            TimeUnit::Milliseconds => 1_000_000.0,
            TimeUnit::Seconds => 1_000_000_000.0,
            TimeUnit::Minutes => 60_000_000_000.0,
        }
    }

    /// Convert a nanosecond count into this unit
    pub fn from_nanos(self, nanos: u128) -> f64 {
        nanos as f64 / self.nanos_per_unit()
    }
}

/// Wall-clock meter backed by a monotonic clock
#[derive(Debug, Clone)]
pub struct TimeMeter {
    unit: TimeUnit,
    origin: ClockOrigin,
}

impl TimeMeter {
    /// Create a time meter reporting in `unit`
    pub fn new(unit: TimeUnit) -> Self {
        Self {
            unit,
            origin: ClockOrigin::now(),
        }
    }

    /// Configured unit
    pub fn time_unit(&self) -> TimeUnit {
        self.unit
    }
}

impl Meter for TimeMeter {
    fn name(&self) -> &str {
        "Time"
    }

    fn unit(&self) -> &str {
        self.unit.abbreviation()
    }

    fn unit_description(&self) -> &str {
        self.unit.description()
    }

    fn value(&self) -> Result<f64, MeterError> {
        Ok(self.unit.from_nanos(self.origin.elapsed_nanos()))
    }
}

// ─── Counting ────────────────────────────────────────────────────────────────

static NEXT_COUNTER_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    // Tick counts per counter id, for the current thread
    static TICKS: RefCell<FxHashMap<u64, u64>> = RefCell::new(FxHashMap::default());
}

/// Monotonically increasing counter; every reading is one tick.
///
/// Counts are kept per thread, so executors running on other threads never
/// advance the count between the two readings around a benchmark and each
/// sample is exactly 1.
#[derive(Debug)]
pub struct CountingMeter {
    name: String,
    id: u64,
}

impl CountingMeter {
    /// Create a counter named "Counter"
    pub fn new() -> Self {
        Self::with_name("Counter")
    }

    /// Create a counter with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: NEXT_COUNTER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Current count on the calling thread, without ticking
    pub fn current(&self) -> u64 {
        TICKS.with(|ticks| ticks.borrow().get(&self.id).copied().unwrap_or(0))
    }

    fn tick(&self) -> u64 {
        TICKS.with(|ticks| {
            let mut ticks = ticks.borrow_mut();
            let count = ticks.entry(self.id).or_insert(0);
            *count += 1;
            *count
        })
    }
}

impl Default for CountingMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter for CountingMeter {
    fn name(&self) -> &str {
        &self.name
    }

    fn unit(&self) -> &str {
        "ticks"
    }

    fn unit_description(&self) -> &str {
        "simple ticks for counting"
    }

    fn value(&self) -> Result<f64, MeterError> {
        Ok(self.tick() as f64)
    }
}

// ─── Cycles ──────────────────────────────────────────────────────────────────

/// Hardware cycle counter meter
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleMeter;

impl Meter for CycleMeter {
    fn name(&self) -> &str {
        "Cycles"
    }

    fn unit(&self) -> &str {
        "cycles"
    }

    fn unit_description(&self) -> &str {
        "CPU cycle counter ticks"
    }

    fn value(&self) -> Result<f64, MeterError> {
        if !HAS_CYCLE_COUNTER {
            return Err(MeterError::Unavailable {
                meter: self.name().to_string(),
                reason: "no cycle counter on this architecture".to_string(),
            });
        }
        Ok(read_cycles() as f64)
    }
}

// ─── Allocations ─────────────────────────────────────────────────────────────

/// Heap bytes allocated, as seen by `TrackingAllocator`
///
/// The allocation counters are process-global: allocations made by other
/// threads between the two readings (for example by classes running in
/// parallel) are included in the sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocationMeter;

impl Meter for AllocationMeter {
    fn name(&self) -> &str {
        "Allocated"
    }

    fn unit(&self) -> &str {
        "bytes"
    }

    fn unit_description(&self) -> &str {
        "heap bytes allocated"
    }

    fn value(&self) -> Result<f64, MeterError> {
        if !is_installed() {
            return Err(MeterError::Unavailable {
                meter: self.name().to_string(),
                reason: "TrackingAllocator is not the global allocator".to_string(),
            });
        }
        Ok(allocated_bytes() as f64)
    }
}

// ─── Meter set ───────────────────────────────────────────────────────────────

/// Ordered set of meters registered for a run.
///
/// Duplicates by `MeterKey` are dropped (first registration wins). Cloning
/// shares the underlying meters; equality compares keys only.
#[derive(Clone)]
pub struct MeterSet {
    meters: Arc<[Arc<dyn Meter>]>,
}

impl MeterSet {
    /// Build a set from meters in registration order
    pub fn new(meters: impl IntoIterator<Item = Arc<dyn Meter>>) -> Self {
        let mut unique: Vec<Arc<dyn Meter>> = Vec::new();
        for meter in meters {
            let key = meter.key();
            if unique.iter().all(|m| m.key() != key) {
                unique.push(meter);
            }
        }
        Self {
            meters: unique.into(),
        }
    }

    /// An empty set
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Iterate meters in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Meter>> {
        self.meters.iter()
    }

    /// Keys in registration order
    pub fn keys(&self) -> Vec<MeterKey> {
        self.meters.iter().map(|m| m.key()).collect()
    }

    /// Whether a meter with this key is registered
    pub fn contains(&self, key: &MeterKey) -> bool {
        self.meters.iter().any(|m| &m.key() == key)
    }

    /// Number of meters
    pub fn len(&self) -> usize {
        self.meters.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }
}

impl PartialEq for MeterSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .meters
                .iter()
                .zip(other.meters.iter())
                .all(|(a, b)| a.key() == b.key())
    }
}

impl Eq for MeterSet {}

impl fmt::Debug for MeterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

impl Default for MeterSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<Arc<dyn Meter>> for MeterSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Meter>>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_counting_meter_ticks() {
        let meter = CountingMeter::new();
        let before = meter.value().unwrap();
        let after = meter.value().unwrap();
        assert!((after - before - 1.0).abs() < f64::EPSILON);
        assert_eq!(meter.current(), 2);
    }

    #[test]
    fn test_counting_meter_ignores_other_threads() {
        let meter = Arc::new(CountingMeter::new());
        let before = meter.value().unwrap();

        let other = meter.clone();
        std::thread::spawn(move || {
            for _ in 0..100 {
                other.value().unwrap();
            }
            assert_eq!(other.current(), 100);
        })
        .join()
        .unwrap();

        let after = meter.value().unwrap();
        assert_eq!(after - before, 1.0);
        assert_eq!(meter.current(), 2);
    }

    #[test]
    fn test_counting_meters_count_independently() {
        let a = CountingMeter::new();
        let b = CountingMeter::with_name("Other");

        let before = a.value().unwrap();
        b.value().unwrap();
        b.value().unwrap();
        let after = a.value().unwrap();

        assert_eq!(after - before, 1.0);
        assert_eq!(b.current(), 2);
    }

    #[test]
    fn test_time_meter_advances() {
        let meter = TimeMeter::new(TimeUnit::Milliseconds);
        let before = meter.value().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        let after = meter.value().unwrap();

        assert!(after - before >= 5.0);
        assert_eq!(meter.unit(), "ms");
    }

    #[test]
    fn test_time_unit_conversion() {
        assert!((TimeUnit::Seconds.from_nanos(1_500_000_000) - 1.5).abs() < 1e-9);
        assert!((TimeUnit::Microseconds.from_nanos(2_000) - 2.0).abs() < 1e-9);
        assert!((TimeUnit::Minutes.from_nanos(90_000_000_000) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_meter_set_dedups_by_key() {
        let set = MeterSet::new([
            Arc::new(TimeMeter::new(TimeUnit::Milliseconds)) as Arc<dyn Meter>,
            Arc::new(CountingMeter::new()),
            Arc::new(TimeMeter::new(TimeUnit::Milliseconds)),
            Arc::new(TimeMeter::new(TimeUnit::Seconds)),
        ]);

        assert_eq!(set.len(), 3);
        assert!(set.contains(&MeterKey::new("Time", "s")));
    }

    #[test]
    fn test_meter_set_equality_ignores_values() {
        let counter: Arc<dyn Meter> = Arc::new(CountingMeter::new());
        let a = MeterSet::new([counter.clone()]);
        for _ in 0..10 {
            counter.value().unwrap();
        }
        let b = MeterSet::new([Arc::new(CountingMeter::new()) as Arc<dyn Meter>]);

        assert_eq!(a, b);
        assert_ne!(a, MeterSet::empty());
    }
}
