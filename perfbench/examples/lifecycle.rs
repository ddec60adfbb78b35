//! perfbench Example Benchmarks
//!
//! Two benchmarked types showing lifecycle hooks, per-method repetitions
//! and failure reporting.
//!
//! Run with:
//!   cargo run --example lifecycle
//!   RUST_LOG=perfbench_runner=debug cargo run --example lifecycle
//!
//! A `perfbench.toml` in the working directory (or a parent) selects meters
//! and the default repetition count.

use perfbench::prelude::*;
use perfbench::{MeterKey, class};
use std::collections::HashMap;
use std::hint::black_box;

// ============================================================================
// Collections
// ============================================================================

#[derive(Default)]
struct Collections {
    input: Vec<u64>,
    map: HashMap<u64, u64>,
}

#[bench_class(runs = 20)]
impl Collections {
    /// Build the shared input once
    #[before_first_run]
    pub fn generate(&mut self) {
        self.input = (0..10_000u64).map(|i| i.wrapping_mul(2_654_435_761) % 10_007).collect();
    }

    /// Every repetition starts from an empty map
    #[before_each_run]
    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[bench]
    pub fn insert_all(&mut self) {
        for &v in &self.input {
            *self.map.entry(v).or_default() += 1;
        }
    }

    #[bench(runs = 50)]
    pub fn sort_copy(&self) {
        let mut copy = self.input.clone();
        copy.sort_unstable();
        black_box(copy);
    }

    /// Fires once, after the first repetition of the first benchmark
    #[after_last_run]
    pub fn report_size(&mut self) {
        tracing::info!(entries = self.map.len(), input = self.input.len(), "collections ready");
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Default)]
struct Parsing {
    text: String,
}

#[bench_class(bench_all = true, runs = 10)]
impl Parsing {
    #[before_each_run]
    pub fn load(&mut self) {
        self.text = (0..1_000).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
    }

    pub fn parse_numbers(&self) -> Result<(), std::num::ParseIntError> {
        for field in self.text.split(',') {
            black_box(field.parse::<u32>()?);
        }
        Ok(())
    }

    /// Fails on purpose to show failure reporting
    pub fn parse_hex(&self) -> Result<(), std::num::ParseIntError> {
        for field in self.text.split(',') {
            black_box(u8::from_str_radix(field, 16)?);
        }
        Ok(())
    }

    #[skip_bench]
    pub fn slow_reference(&self) {}
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> anyhow::Result<()> {
    let outcome = perfbench::run(&[class::<Collections>(), class::<Parsing>()])?;

    let time = outcome
        .result
        .meters()
        .keys()
        .into_iter()
        .find(|k| k.name == "Time");

    for class_result in outcome.result.class_results() {
        println!("{}", class_result.class());
        for method in class_result.method_results() {
            let summary = match &time {
                Some(key) => mean(method.samples(key), key),
                None => String::new(),
            };
            println!(
                "  {:<16} {:>4} runs {:>3} failed  {}",
                method.method().name,
                method.invocations(),
                method.failed_invocations(),
                summary
            );
        }
    }

    for failure in &outcome.failures {
        println!("failed: {failure}");
    }
    Ok(())
}

fn mean(samples: &[f64], key: &MeterKey) -> String {
    if samples.is_empty() {
        return String::new();
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    format!("mean {mean:.3} {}", key.unit)
}
