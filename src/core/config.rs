//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::scenario::{DemandDistribution, Rounding};
use crate::core::stability::{OutOfSampleConfig, SeedPolicy, StabilityConfig};
use crate::core::Project;

/// Seed of the expected-value baseline draw
pub const DEFAULT_BASELINE_SEED: u64 = 42;

/// ATO configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog directory; the embedded reference catalog when unset
    pub catalog: Option<PathBuf>,

    /// Days per planning week
    pub operating_days: Option<u32>,

    pub demand_mean: Option<f64>,
    pub demand_std_dev: Option<f64>,
    pub rounding: Option<Rounding>,

    /// Solve the two in-sample models of an iteration concurrently
    pub parallel: Option<bool>,

    pub baseline_seed: Option<u64>,

    pub in_sample: SearchSettings,
    pub out_of_sample: SearchSettings,
    pub seeds: SeedSettings,
}

/// `in_sample` / `out_of_sample` tables
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub starting_scenarios: Option<usize>,
    pub max_iterations: Option<usize>,
    pub step: Option<usize>,
    pub alpha: Option<f64>,

    /// Out-of-sample only
    pub reference_scenarios: Option<usize>,
}

/// `seeds` table
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    pub first_stride: Option<u64>,
    pub second_stride: Option<u64>,
    pub second_offset: Option<u64>,
    pub reference_seed: Option<u64>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/ato/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.ato/config.yaml)
        if let Some(project) = project {
            if let Some(mut project_config) = Self::read_file(&project.config_path()) {
                // Relative catalog paths are relative to the project root
                if let Some(catalog) = project_config.catalog.take() {
                    project_config.catalog = Some(project.root().join(catalog));
                }
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(catalog) = std::env::var("ATO_CATALOG") {
            if !catalog.is_empty() {
                config.catalog = Some(PathBuf::from(catalog));
            }
        }
        if let Ok(parallel) = std::env::var("ATO_PARALLEL") {
            match parse_flag(&parallel) {
                Some(flag) => config.parallel = Some(flag),
                None => warn!(value = %parallel, "ignoring unrecognised ATO_PARALLEL"),
            }
        }

        config
    }

    /// Parse a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read config");
                return None;
            }
        };
        match Self::from_yaml(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config");
                Some(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ato")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.catalog.is_some() {
            self.catalog = other.catalog;
        }
        if other.operating_days.is_some() {
            self.operating_days = other.operating_days;
        }
        if other.demand_mean.is_some() {
            self.demand_mean = other.demand_mean;
        }
        if other.demand_std_dev.is_some() {
            self.demand_std_dev = other.demand_std_dev;
        }
        if other.rounding.is_some() {
            self.rounding = other.rounding;
        }
        if other.parallel.is_some() {
            self.parallel = other.parallel;
        }
        if other.baseline_seed.is_some() {
            self.baseline_seed = other.baseline_seed;
        }
        self.in_sample.merge(other.in_sample);
        self.out_of_sample.merge(other.out_of_sample);
        self.seeds.merge(other.seeds);
    }

    pub fn demand_distribution(&self) -> DemandDistribution {
        let defaults = DemandDistribution::default();
        DemandDistribution {
            mean: self.demand_mean.unwrap_or(defaults.mean),
            std_dev: self.demand_std_dev.unwrap_or(defaults.std_dev),
            rounding: self.rounding.unwrap_or(defaults.rounding),
        }
    }

    pub fn baseline_seed(&self) -> u64 {
        self.baseline_seed.unwrap_or(DEFAULT_BASELINE_SEED)
    }

    pub fn parallel(&self) -> bool {
        self.parallel.unwrap_or(true)
    }

    pub fn in_sample_config(&self) -> StabilityConfig {
        self.in_sample
            .apply(StabilityConfig::in_sample_default(), self.parallel())
    }

    pub fn out_of_sample_config(&self) -> OutOfSampleConfig {
        let defaults = OutOfSampleConfig::default();
        OutOfSampleConfig {
            search: self.out_of_sample.apply(defaults.search, self.parallel()),
            reference_scenarios: self
                .out_of_sample
                .reference_scenarios
                .unwrap_or(defaults.reference_scenarios),
        }
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        let defaults = SeedPolicy::default();
        SeedPolicy {
            first_stride: self.seeds.first_stride.unwrap_or(defaults.first_stride),
            second_stride: self.seeds.second_stride.unwrap_or(defaults.second_stride),
            second_offset: self.seeds.second_offset.unwrap_or(defaults.second_offset),
            reference_seed: self.seeds.reference_seed.unwrap_or(defaults.reference_seed),
        }
    }
}

impl SearchSettings {
    fn merge(&mut self, other: SearchSettings) {
        if other.starting_scenarios.is_some() {
            self.starting_scenarios = other.starting_scenarios;
        }
        if other.max_iterations.is_some() {
            self.max_iterations = other.max_iterations;
        }
        if other.step.is_some() {
            self.step = other.step;
        }
        if other.alpha.is_some() {
            self.alpha = other.alpha;
        }
        if other.reference_scenarios.is_some() {
            self.reference_scenarios = other.reference_scenarios;
        }
    }

    fn apply(&self, defaults: StabilityConfig, parallel: bool) -> StabilityConfig {
        StabilityConfig {
            starting_scenarios: self.starting_scenarios.unwrap_or(defaults.starting_scenarios),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            step: self.step.unwrap_or(defaults.step),
            alpha: self.alpha.unwrap_or(defaults.alpha),
            parallel,
        }
    }
}

impl SeedSettings {
    fn merge(&mut self, other: SeedSettings) {
        if other.first_stride.is_some() {
            self.first_stride = other.first_stride;
        }
        if other.second_stride.is_some() {
            self.second_stride = other.second_stride;
        }
        if other.second_offset.is_some() {
            self.second_offset = other.second_offset;
        }
        if other.reference_seed.is_some() {
            self.reference_seed = other.reference_seed;
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stability::{IN_SAMPLE_ALPHA, OUT_OF_SAMPLE_ALPHA};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.demand_distribution(), DemandDistribution::default());
        assert_eq!(config.baseline_seed(), 42);
        assert!(config.parallel());

        let in_sample = config.in_sample_config();
        assert_eq!(in_sample.starting_scenarios, 2);
        assert_eq!(in_sample.max_iterations, 50);
        assert_eq!(in_sample.alpha, IN_SAMPLE_ALPHA);

        let out_of_sample = config.out_of_sample_config();
        assert_eq!(out_of_sample.reference_scenarios, 55);
        assert_eq!(out_of_sample.search.alpha, OUT_OF_SAMPLE_ALPHA);
        assert_eq!(config.seed_policy(), SeedPolicy::default());
    }

    #[test]
    fn test_parse_nested_tables() {
        let config = Config::from_yaml(
            r#"
operating_days: 5
rounding: round
parallel: false
in_sample:
  max_iterations: 10
  alpha: 0.05
out_of_sample:
  reference_scenarios: 20
seeds:
  reference_seed: 7
"#,
        )
        .unwrap();

        assert_eq!(config.operating_days, Some(5));
        assert_eq!(config.demand_distribution().rounding, Rounding::Round);

        let in_sample = config.in_sample_config();
        assert_eq!(in_sample.max_iterations, 10);
        assert_eq!(in_sample.alpha, 0.05);
        assert_eq!(in_sample.step, 1);
        assert!(!in_sample.parallel);

        assert_eq!(config.out_of_sample_config().reference_scenarios, 20);
        assert_eq!(config.seed_policy().reference_seed, 7);
        assert_eq!(config.seed_policy().first_stride, 42);
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = Config::from_yaml("demand_mean: 80\nin_sample:\n  step: 2\n").unwrap();
        let overlay = Config::from_yaml("demand_std_dev: 10\nin_sample:\n  alpha: 0.1\n").unwrap();
        base.merge(overlay);

        let distribution = base.demand_distribution();
        assert_eq!(distribution.mean, 80.0);
        assert_eq!(distribution.std_dev, 10.0);
        assert_eq!(base.in_sample.step, Some(2));
        assert_eq!(base.in_sample.alpha, Some(0.1));
    }

    #[test]
    fn test_project_catalog_is_relative_to_root() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::init(tmp.path(), false).unwrap();
        let config = Config::load_for(Some(&project));
        assert_eq!(config.catalog, Some(project.root().join("data")));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
