//! In-sample and out-of-sample stability of the SAA solution
//!
//! Both analyses grow the scenario count `n` one step per iteration, record an
//! objective difference at `n`, and stop growing as soon as a CLT confidence
//! interval on the mean difference contains zero. They share [`run_search`];
//! only the way a difference is produced differs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::backend::{OptimizationBackend, SolveError};
use crate::core::catalog::Catalog;
use crate::core::model::{AtoModelBuilder, ModelError};
use crate::core::scenario::{ScenarioError, ScenarioGenerator};

pub const IN_SAMPLE_ALPHA: f64 = 0.008;
pub const OUT_OF_SAMPLE_ALPHA: f64 = 0.025;
pub const DEFAULT_REFERENCE_SCENARIOS: usize = 55;

/// Parameters of the scenario-count search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    pub starting_scenarios: usize,
    pub max_iterations: usize,
    pub step: usize,
    pub alpha: f64,

    /// Solve the two in-sample models of an iteration concurrently
    pub parallel: bool,
}

impl StabilityConfig {
    pub fn in_sample_default() -> Self {
        Self {
            starting_scenarios: 2,
            max_iterations: 50,
            step: 1,
            alpha: IN_SAMPLE_ALPHA,
            parallel: true,
        }
    }

    pub fn out_of_sample_default() -> Self {
        Self {
            alpha: OUT_OF_SAMPLE_ALPHA,
            ..Self::in_sample_default()
        }
    }

    pub fn validate(&self) -> Result<(), StabilityError> {
        if self.starting_scenarios == 0 {
            return Err(StabilityError::InvalidConfig {
                field: "starting_scenarios",
                message: "must be at least 1".to_string(),
            });
        }
        if self.step == 0 {
            return Err(StabilityError::InvalidConfig {
                field: "step",
                message: "must be at least 1".to_string(),
            });
        }
        // n grows by at most `step` per iteration
        if self
            .step
            .checked_mul(self.max_iterations)
            .and_then(|growth| growth.checked_add(self.starting_scenarios))
            .is_none()
        {
            return Err(StabilityError::InvalidConfig {
                field: "step",
                message: format!(
                    "{} scenarios per iteration over {} iterations overflows the scenario count",
                    self.step, self.max_iterations
                ),
            });
        }
        validate_alpha(self.alpha)
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self::in_sample_default()
    }
}

fn validate_alpha(alpha: f64) -> Result<(), StabilityError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(StabilityError::InvalidConfig {
            field: "alpha",
            message: format!("{} is outside (0, 1)", alpha),
        });
    }
    Ok(())
}

/// Out-of-sample search plus the size of the reference sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutOfSampleConfig {
    pub search: StabilityConfig,
    pub reference_scenarios: usize,
}

impl Default for OutOfSampleConfig {
    fn default() -> Self {
        Self {
            search: StabilityConfig::out_of_sample_default(),
            reference_scenarios: DEFAULT_REFERENCE_SCENARIOS,
        }
    }
}

impl OutOfSampleConfig {
    pub fn validate(&self) -> Result<(), StabilityError> {
        self.search.validate()?;
        if self.reference_scenarios == 0 {
            return Err(StabilityError::InvalidConfig {
                field: "reference_scenarios",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Seeds used for the draws of iteration `t`
///
/// The first set uses `first_stride * t`, the second `second_stride * t +
/// second_offset`, the out-of-sample reference `reference_seed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    pub first_stride: u64,
    pub second_stride: u64,
    pub second_offset: u64,
    pub reference_seed: u64,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            first_stride: 42,
            second_stride: 84,
            second_offset: 1,
            reference_seed: 1,
        }
    }
}

impl SeedPolicy {
    pub fn first(&self, iteration: usize) -> u64 {
        self.first_stride.wrapping_mul(iteration as u64)
    }

    pub fn second(&self, iteration: usize) -> u64 {
        self.second_stride
            .wrapping_mul(iteration as u64)
            .wrapping_add(self.second_offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Analysis {
    InSample,
    OutOfSample,
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Analysis::InSample => write!(f, "in-sample"),
            Analysis::OutOfSample => write!(f, "out-of-sample"),
        }
    }
}

/// Terminal result of a stability search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StabilityOutcome {
    /// The interval first contained zero at `iteration`, with `scenarios` scenarios
    Stable {
        scenarios: usize,
        difference: f64,
        iteration: usize,
    },

    /// Every iteration was spent without the interval containing zero
    NoStableScenario,

    /// A model could not be solved; `iteration` is `None` for the reference solve
    Infeasible {
        iteration: Option<usize>,
        reason: String,
    },
}

impl StabilityOutcome {
    pub fn is_stable(&self) -> bool {
        matches!(self, StabilityOutcome::Stable { .. })
    }

}

impl fmt::Display for StabilityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StabilityOutcome::Stable { scenarios, .. } => {
                write!(f, "stable with {} scenarios", scenarios)
            }
            StabilityOutcome::NoStableScenario => write!(f, "no scenario satisfies the criterion"),
            StabilityOutcome::Infeasible { .. } => write!(f, "model not feasible"),
        }
    }
}

/// Where the search loop stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Growing,
    Testing,
    Stable,
    Infeasible,
    Exhausted,
}

/// One recorded difference
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StabilityRecord {
    pub iteration: usize,
    pub scenarios: usize,
    pub difference: f64,
}

/// Recorded differences in iteration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StabilityTable {
    records: Vec<StabilityRecord>,
}

impl StabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, record: StabilityRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[StabilityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn differences(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.difference).collect()
    }

    /// Difference per scenario count; a later record replaces an earlier one
    pub fn by_scenario_count(&self) -> BTreeMap<usize, f64> {
        self.records
            .iter()
            .map(|r| (r.scenarios, r.difference))
            .collect()
    }
}

/// `mean ± z·σ/√k` over `k` recorded differences
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub std_dev: f64,
    pub half_width: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Strictly straddles zero
    pub fn contains_zero(&self) -> bool {
        self.upper > 0.0 && self.lower < 0.0
    }
}

/// Two-sided CLT test at level `alpha`
#[derive(Debug, Clone, Copy)]
pub struct CltTest {
    alpha: f64,
    z: f64,
}

impl CltTest {
    pub fn new(alpha: f64) -> Result<Self, StabilityError> {
        validate_alpha(alpha)?;
        let standard = Normal::new(0.0, 1.0).map_err(|e| StabilityError::InvalidConfig {
            field: "alpha",
            message: e.to_string(),
        })?;
        Ok(Self {
            alpha,
            z: standard.inverse_cdf(1.0 - alpha / 2.0),
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// `Φ⁻¹(1 − α/2)`
    pub fn z_critical(&self) -> f64 {
        self.z
    }

    /// Interval over `differences`, using the population standard deviation
    pub fn interval(&self, differences: &[f64]) -> ConfidenceInterval {
        let k = differences.len().max(1) as f64;
        let mean = differences.iter().sum::<f64>() / k;
        let variance = differences.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / k;
        let std_dev = variance.sqrt();
        let half_width = self.z * std_dev / k.sqrt();
        ConfidenceInterval {
            mean,
            std_dev,
            half_width,
            lower: mean - half_width,
            upper: mean + half_width,
        }
    }
}

/// Everything a stability run produced
#[derive(Debug, Clone, Serialize)]
pub struct StabilityReport {
    pub analysis: Analysis,
    pub outcome: StabilityOutcome,
    pub final_state: SearchState,
    pub alpha: f64,
    pub z_critical: f64,
    pub starting_scenarios: usize,
    pub max_iterations: usize,
    pub step: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_scenarios: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_objective: Option<f64>,

    pub backend: String,
    pub generated: DateTime<Utc>,
    pub table: StabilityTable,
}

#[derive(Debug, Error, Diagnostic)]
pub enum StabilityError {
    #[error("invalid stability setting '{field}': {message}")]
    #[diagnostic(code(ato::stability::invalid_config))]
    InvalidConfig { field: &'static str, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),
}

/// Why producing one difference failed
#[derive(Debug)]
pub(crate) enum SearchError {
    /// The backend gave up; ends the search with an infeasible outcome
    Unsolvable(SolveError),

    /// A configuration problem; aborts the run
    Failed(StabilityError),
}

impl From<StabilityError> for SearchError {
    fn from(err: StabilityError) -> Self {
        SearchError::Failed(err)
    }
}

impl From<ModelError> for SearchError {
    fn from(err: ModelError) -> Self {
        SearchError::Failed(err.into())
    }
}

impl From<ScenarioError> for SearchError {
    fn from(err: ScenarioError) -> Self {
        SearchError::Failed(err.into())
    }
}

#[derive(Debug)]
pub(crate) struct SearchOutcome {
    pub outcome: StabilityOutcome,
    pub table: StabilityTable,
    pub state: SearchState,
}

/// The shared growth and stopping loop
///
/// `evaluate(t, n)` produces the difference of iteration `t` at `n`
/// scenarios. A backend failure stops the loop at once.
pub(crate) fn run_search<F>(
    config: &StabilityConfig,
    test: &CltTest,
    mut evaluate: F,
) -> Result<SearchOutcome, StabilityError>
where
    F: FnMut(usize, usize) -> Result<f64, SearchError>,
{
    config.validate()?;

    let mut n = config.starting_scenarios;
    let mut table = StabilityTable::new();
    let mut stable: Option<StabilityOutcome> = None;
    let mut state = SearchState::Growing;

    for t in 0..config.max_iterations {
        let difference = match evaluate(t, n) {
            Ok(d) => d,
            Err(SearchError::Unsolvable(err)) => {
                warn!(iteration = t, scenarios = n, error = %err, "model not solvable, stopping search");
                return Ok(SearchOutcome {
                    outcome: StabilityOutcome::Infeasible {
                        iteration: Some(t),
                        reason: err.to_string(),
                    },
                    table,
                    state: SearchState::Infeasible,
                });
            }
            Err(SearchError::Failed(err)) => return Err(err),
        };

        table.push(StabilityRecord {
            iteration: t,
            scenarios: n,
            difference,
        });

        if t == 0 || stable.is_some() {
            debug!(iteration = t, scenarios = n, difference, "recorded");
            n += config.step;
            continue;
        }

        state = SearchState::Testing;
        let interval = test.interval(&table.differences());
        debug!(
            iteration = t,
            scenarios = n,
            difference,
            mean = interval.mean,
            std_dev = interval.std_dev,
            lower = interval.lower,
            upper = interval.upper,
            ?state,
            "tested"
        );

        if interval.contains_zero() {
            info!(iteration = t, scenarios = n, "interval contains zero");
            stable = Some(StabilityOutcome::Stable {
                scenarios: n,
                difference,
                iteration: t,
            });
            state = SearchState::Stable;
        } else {
            state = SearchState::Growing;
            n += config.step;
        }
    }

    let outcome = match stable {
        Some(outcome) => outcome,
        None => {
            state = SearchState::Exhausted;
            info!(iterations = config.max_iterations, "no stable scenario count found");
            StabilityOutcome::NoStableScenario
        }
    };

    Ok(SearchOutcome {
        outcome,
        table,
        state,
    })
}

/// Runs stability analyses of the ATO model over a fixed catalog
pub struct StabilityEstimator<'a, B> {
    catalog: &'a Catalog,
    generator: ScenarioGenerator,
    backend: B,
    seeds: SeedPolicy,
}

impl<'a, B: OptimizationBackend> StabilityEstimator<'a, B> {
    pub fn new(catalog: &'a Catalog, generator: ScenarioGenerator, backend: B) -> Self {
        Self {
            catalog,
            generator,
            backend,
            seeds: SeedPolicy::default(),
        }
    }

    pub fn with_seeds(mut self, seeds: SeedPolicy) -> Self {
        self.seeds = seeds;
        self
    }

    /// Optimal objective of the SAA model over `count` scenarios drawn with `seed`
    fn objective(&self, count: usize, seed: u64) -> Result<f64, SearchError> {
        let scenarios = self
            .generator
            .sample_set(count, self.catalog.num_products(), seed)?;
        let ato = AtoModelBuilder::new(self.catalog).build(&scenarios)?;
        self.backend
            .solve(ato.model())
            .map(|solution| solution.objective_value())
            .map_err(SearchError::Unsolvable)
    }

    /// Two independent sets of equal size per iteration
    pub fn in_sample(&self, config: &StabilityConfig) -> Result<StabilityReport, StabilityError> {
        config.validate()?;
        let test = CltTest::new(config.alpha)?;
        info!(
            start = config.starting_scenarios,
            max_iterations = config.max_iterations,
            alpha = config.alpha,
            "in-sample stability"
        );

        let search = run_search(config, &test, |t, n| {
            let first_seed = self.seeds.first(t);
            let second_seed = self.seeds.second(t);
            let (first, second) = if config.parallel {
                rayon::join(
                    || self.objective(n, first_seed),
                    || self.objective(n, second_seed),
                )
            } else {
                (self.objective(n, first_seed), self.objective(n, second_seed))
            };
            Ok((first? - second?).abs())
        })?;

        Ok(self.report(Analysis::InSample, config, &test, None, None, search))
    }

    /// One set per iteration against a single large reference sample
    pub fn out_of_sample(&self, config: &OutOfSampleConfig) -> Result<StabilityReport, StabilityError> {
        config.validate()?;
        let search_config = &config.search;
        let test = CltTest::new(search_config.alpha)?;
        info!(
            start = search_config.starting_scenarios,
            max_iterations = search_config.max_iterations,
            reference = config.reference_scenarios,
            alpha = search_config.alpha,
            "out-of-sample stability"
        );

        let reference = match self.objective(config.reference_scenarios, self.seeds.reference_seed) {
            Ok(value) => value,
            Err(SearchError::Unsolvable(err)) => {
                warn!(error = %err, "reference model not solvable");
                let search = SearchOutcome {
                    outcome: StabilityOutcome::Infeasible {
                        iteration: None,
                        reason: err.to_string(),
                    },
                    table: StabilityTable::new(),
                    state: SearchState::Infeasible,
                };
                return Ok(self.report(
                    Analysis::OutOfSample,
                    search_config,
                    &test,
                    Some(config.reference_scenarios),
                    None,
                    search,
                ));
            }
            Err(SearchError::Failed(err)) => return Err(err),
        };
        debug!(reference, "reference objective");

        let search = run_search(search_config, &test, |t, n| {
            Ok((self.objective(n, self.seeds.first(t))? - reference).abs())
        })?;

        Ok(self.report(
            Analysis::OutOfSample,
            search_config,
            &test,
            Some(config.reference_scenarios),
            Some(reference),
            search,
        ))
    }

    fn report(
        &self,
        analysis: Analysis,
        config: &StabilityConfig,
        test: &CltTest,
        reference_scenarios: Option<usize>,
        reference_objective: Option<f64>,
        search: SearchOutcome,
    ) -> StabilityReport {
        info!(%analysis, outcome = %search.outcome, records = search.table.len(), "stability finished");
        StabilityReport {
            analysis,
            outcome: search.outcome,
            final_state: search.state,
            alpha: test.alpha(),
            z_critical: test.z_critical(),
            starting_scenarios: config.starting_scenarios,
            max_iterations: config.max_iterations,
            step: config.step,
            reference_scenarios,
            reference_objective,
            backend: self.backend.name().to_string(),
            generated: Utc::now(),
            table: search.table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_iterations: usize) -> StabilityConfig {
        StabilityConfig {
            max_iterations,
            ..StabilityConfig::in_sample_default()
        }
    }

    fn scripted(diffs: Vec<f64>) -> impl FnMut(usize, usize) -> Result<f64, SearchError> {
        move |t, _| Ok(diffs[t % diffs.len()])
    }

    #[test]
    fn test_z_critical() {
        let test = CltTest::new(0.05).unwrap();
        assert!((test.z_critical() - 1.959964).abs() < 1e-5);

        let test = CltTest::new(IN_SAMPLE_ALPHA).unwrap();
        assert!((test.z_critical() - 2.652).abs() < 1e-3);
    }

    #[test]
    fn test_interval_uses_population_std_dev() {
        let test = CltTest::new(0.05).unwrap();
        let interval = test.interval(&[10.0, 0.0]);
        assert_eq!(interval.mean, 5.0);
        assert_eq!(interval.std_dev, 5.0);
        assert!((interval.half_width - 1.959964 * 5.0 / 2f64.sqrt()).abs() < 1e-4);
        assert!(interval.contains_zero());
    }

    #[test]
    fn test_interval_on_zero_differences_is_not_stable() {
        let test = CltTest::new(0.05).unwrap();
        assert!(!test.interval(&[0.0, 0.0, 0.0]).contains_zero());
    }

    #[test]
    fn test_first_test_passes_and_freezes_count() {
        let test = CltTest::new(IN_SAMPLE_ALPHA).unwrap();
        let search = run_search(&config(4), &test, scripted(vec![10.0, 0.0, 7.0, 3.0])).unwrap();

        assert_eq!(
            search.outcome,
            StabilityOutcome::Stable {
                scenarios: 3,
                difference: 0.0,
                iteration: 1
            }
        );
        assert_eq!(search.state, SearchState::Stable);

        // recording continues after the result is frozen
        let counts: Vec<usize> = search.table.records().iter().map(|r| r.scenarios).collect();
        assert_eq!(counts, vec![2, 3, 3, 4]);

        let view = search.table.by_scenario_count();
        assert_eq!(view.len(), 3);
        assert_eq!(view[&3], 7.0);
    }

    #[test]
    fn test_constant_differences_never_stabilise() {
        let test = CltTest::new(IN_SAMPLE_ALPHA).unwrap();
        let search = run_search(&config(3), &test, scripted(vec![5.0])).unwrap();

        assert_eq!(search.outcome, StabilityOutcome::NoStableScenario);
        assert_eq!(search.state, SearchState::Exhausted);
        let counts: Vec<usize> = search.table.records().iter().map(|r| r.scenarios).collect();
        assert_eq!(counts, vec![2, 3, 4]);
    }

    #[test]
    fn test_step_grows_count() {
        let test = CltTest::new(IN_SAMPLE_ALPHA).unwrap();
        let cfg = StabilityConfig {
            step: 3,
            ..config(3)
        };
        let search = run_search(&cfg, &test, scripted(vec![5.0])).unwrap();
        let counts: Vec<usize> = search.table.records().iter().map(|r| r.scenarios).collect();
        assert_eq!(counts, vec![2, 5, 8]);
    }

    #[test]
    fn test_failure_stops_before_later_iterations() {
        let test = CltTest::new(IN_SAMPLE_ALPHA).unwrap();
        let mut calls = Vec::new();
        let search = run_search(&config(10), &test, |t, _| {
            calls.push(t);
            if t == 2 {
                Err(SearchError::Unsolvable(SolveError::Infeasible))
            } else {
                Ok(5.0)
            }
        })
        .unwrap();

        assert_eq!(calls, vec![0, 1, 2]);
        assert_eq!(search.table.len(), 2);
        assert_eq!(search.state, SearchState::Infeasible);
        assert!(matches!(
            search.outcome,
            StabilityOutcome::Infeasible {
                iteration: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_no_iterations() {
        let test = CltTest::new(IN_SAMPLE_ALPHA).unwrap();
        let search = run_search(&config(0), &test, |_, _| -> Result<f64, SearchError> {
            panic!("nothing should be evaluated")
        })
        .unwrap();
        assert!(search.table.is_empty());
        assert_eq!(search.outcome, StabilityOutcome::NoStableScenario);
    }

    #[test]
    fn test_overflowing_step_rejected_before_evaluating() {
        let test = CltTest::new(IN_SAMPLE_ALPHA).unwrap();
        let cfg = StabilityConfig {
            step: usize::MAX,
            ..config(3)
        };
        let result = run_search(&cfg, &test, |_, _| -> Result<f64, SearchError> {
            panic!("nothing should be evaluated")
        });
        assert!(matches!(
            result,
            Err(StabilityError::InvalidConfig { field: "step", .. })
        ));

        // one iteration of a huge step still fits
        let cfg = StabilityConfig {
            step: usize::MAX - 2,
            ..config(1)
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut cfg = StabilityConfig::in_sample_default();
        assert!(cfg.validate().is_ok());

        cfg.starting_scenarios = 0;
        assert!(cfg.validate().is_err());

        let cfg = StabilityConfig {
            step: 0,
            ..StabilityConfig::in_sample_default()
        };
        assert!(cfg.validate().is_err());

        for alpha in [0.0, 1.0, -0.1, f64::NAN] {
            let cfg = StabilityConfig {
                alpha,
                ..StabilityConfig::in_sample_default()
            };
            assert!(cfg.validate().is_err(), "alpha {} accepted", alpha);
        }

        let oos = OutOfSampleConfig {
            reference_scenarios: 0,
            ..OutOfSampleConfig::default()
        };
        assert!(oos.validate().is_err());
    }

    #[test]
    fn test_seed_policy() {
        let seeds = SeedPolicy::default();
        assert_eq!(seeds.first(0), 0);
        assert_eq!(seeds.first(3), 126);
        assert_eq!(seeds.second(0), 1);
        assert_eq!(seeds.second(3), 253);
    }

    #[test]
    fn test_outcome_display() {
        let stable = StabilityOutcome::Stable {
            scenarios: 7,
            difference: 1.5,
            iteration: 4,
        };
        assert_eq!(stable.to_string(), "stable with 7 scenarios");
        assert_eq!(
            StabilityOutcome::NoStableScenario.to_string(),
            "no scenario satisfies the criterion"
        );
        let infeasible = StabilityOutcome::Infeasible {
            iteration: Some(0),
            reason: "model is infeasible".to_string(),
        };
        assert_eq!(infeasible.to_string(), "model not feasible");
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(StabilityOutcome::Stable {
            scenarios: 7,
            difference: 1.5,
            iteration: 4,
        })
        .unwrap();
        assert_eq!(json["status"], "stable");
        assert_eq!(json["scenarios"], 7);
    }
}
