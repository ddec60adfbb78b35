//! Configuration loading from perfbench.toml
//!
//! Configuration can be specified in a `perfbench.toml` file in the project root.
//! The configuration is discovered by walking up from the current directory.

use perfbench_core::{
    AllocationMeter, CountingMeter, CycleMeter, Meter, MeterSet, TimeMeter, TimeUnit,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// File name looked up by [`PerfConfig::discover`]
pub const CONFIG_FILE: &str = "perfbench.toml";

/// perfbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PerfConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunConfig,
    /// Meter selection
    #[serde(default)]
    pub meters: MeterConfig,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Repetitions for elements that request none themselves
    #[serde(default = "default_runs")]
    pub runs: u32,
    /// Run different classes in parallel
    #[serde(default)]
    pub parallel: bool,
    /// Worker threads for parallel runs (0 = global rayon pool)
    #[serde(default)]
    pub threads: usize,
    /// Regex over element ids (`Class::method`); unset runs everything
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            parallel: false,
            threads: 0,
            filter: None,
        }
    }
}

fn default_runs() -> u32 {
    1
}

/// Meter selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeterConfig {
    /// Wall-clock time
    #[serde(default = "default_true")]
    pub time: bool,
    /// Unit for wall-clock time
    #[serde(default)]
    pub time_unit: TimeUnit,
    /// Invocation counter
    #[serde(default = "default_true")]
    pub counter: bool,
    /// Hardware cycle counter
    #[serde(default)]
    pub cycles: bool,
    /// Heap allocation bytes (requires `TrackingAllocator`)
    #[serde(default)]
    pub allocations: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            time: true,
            time_unit: TimeUnit::default(),
            counter: true,
            cycles: false,
            allocations: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl MeterConfig {
    /// Build the meter set for a run, in a fixed order
    pub fn build(&self) -> MeterSet {
        let mut meters: Vec<Arc<dyn Meter>> = Vec::new();
        if self.time {
            meters.push(Arc::new(TimeMeter::new(self.time_unit)));
        }
        if self.counter {
            meters.push(Arc::new(CountingMeter::new()));
        }
        if self.cycles {
            meters.push(Arc::new(CycleMeter));
        }
        if self.allocations {
            meters.push(Arc::new(AllocationMeter));
        }
        MeterSet::new(meters)
    }
}

impl PerfConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), error = %e, "ignoring unreadable config");
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# perfbench configuration

[runner]
# Repetitions for benchmarks that do not set `runs` themselves
runs = 1
# Run different classes in parallel
parallel = false
# Worker threads for parallel runs (0 = all cores)
threads = 0
# Only run elements whose `Class::method` id matches (uncomment to enable)
# filter = "Parser::.*"

[meters]
# Wall-clock time
time = true
# nanoseconds, microseconds, milliseconds, seconds or minutes
time_unit = "milliseconds"
# Invocation counter
counter = true
# Hardware cycle counter
cycles = false
# Heap bytes allocated (requires TrackingAllocator as global allocator)
allocations = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfbench_core::MeterKey;

    #[test]
    fn test_default_config() {
        let config = PerfConfig::default();
        assert_eq!(config.runner.runs, 1);
        assert!(!config.runner.parallel);
        assert!(config.meters.time);
        assert_eq!(config.meters.time_unit, TimeUnit::Milliseconds);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            runs = 5
            parallel = true

            [meters]
            time_unit = "seconds"
            counter = false
        "#;

        let config: PerfConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.runs, 5);
        assert!(config.runner.parallel);
        assert_eq!(config.meters.time_unit, TimeUnit::Seconds);
        assert!(!config.meters.counter);
        // Defaults should still apply
        assert_eq!(config.runner.threads, 0);
        assert!(config.meters.time);
    }

    #[test]
    fn test_default_toml_parses() {
        let config: PerfConfig = toml::from_str(&PerfConfig::default_toml()).unwrap();
        assert_eq!(config, PerfConfig::default());
    }

    #[test]
    fn test_meter_selection() {
        let meters = MeterConfig {
            time_unit: TimeUnit::Microseconds,
            cycles: true,
            ..MeterConfig::default()
        }
        .build();

        assert_eq!(
            meters.keys(),
            vec![
                MeterKey::new("Time", "us"),
                MeterKey::new("Counter", "ticks"),
                MeterKey::new("Cycles", "cycles"),
            ]
        );
    }
}
