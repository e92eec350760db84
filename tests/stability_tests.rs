//! Stability estimator tests against scripted backends
//!
//! `RevenueBackend` "solves" a model by assembling exactly the demanded
//! quantities and buying nothing, so each objective is the expected revenue
//! of the drawn scenarios. That keeps runs over the full reference catalog
//! fast while still exercising draws, model building and the search loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ato::core::{
    AtoModelBuilder, Catalog, Component, DemandDistribution, Machine, MicroLpBackend,
    OptimizationBackend, OptimizationModel, OutOfSampleConfig, Product, ScenarioGenerator,
    SearchState, SeedPolicy, Solution, SolveError, StabilityConfig, StabilityEstimator,
    StabilityOutcome,
};

struct RevenueBackend {
    products: usize,
    /// Report infeasible for models with at least this many scenarios
    fail_at: Option<usize>,
    calls: AtomicUsize,
    sizes: Mutex<Vec<usize>>,
}

impl RevenueBackend {
    fn new(products: usize) -> Self {
        Self {
            products,
            fail_at: None,
            calls: AtomicUsize::new(0),
            sizes: Mutex::new(Vec::new()),
        }
    }

    fn failing_at(products: usize, scenarios: usize) -> Self {
        Self {
            fail_at: Some(scenarios),
            ..Self::new(products)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn largest_model(&self) -> usize {
        self.sizes.lock().unwrap().iter().copied().max().unwrap_or(0)
    }
}

impl OptimizationBackend for RevenueBackend {
    fn solve(&self, model: &OptimizationModel) -> Result<Solution, SolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let caps: Vec<_> = model.constraints_named("demand_cap").collect();
        let scenarios = caps.len() / self.products;
        self.sizes.lock().unwrap().push(scenarios);

        if self.fail_at.is_some_and(|limit| scenarios >= limit) {
            return Err(SolveError::Infeasible);
        }

        let mut values = vec![0.0; model.variables().len()];
        for cap in caps {
            let (var, _) = cap.lhs.terms()[0];
            values[var.index()] = cap.rhs;
        }
        Ok(Solution::new(model.objective().evaluate(&values), values))
    }

    fn name(&self) -> &str {
        "revenue"
    }
}

fn generator() -> ScenarioGenerator {
    ScenarioGenerator::new(&DemandDistribution::default()).unwrap()
}

fn in_sample(max_iterations: usize) -> StabilityConfig {
    StabilityConfig {
        max_iterations,
        ..StabilityConfig::in_sample_default()
    }
}

fn out_of_sample(max_iterations: usize) -> OutOfSampleConfig {
    let mut config = OutOfSampleConfig::default();
    config.search.max_iterations = max_iterations;
    config
}

// =========================================================================
// In-sample
// =========================================================================

#[test]
fn test_in_sample_reference_run_terminates_within_budget() {
    ato::logging::init_test();
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::new(catalog.num_products());
    let estimator = StabilityEstimator::new(&catalog, generator(), &backend);

    let report = estimator.in_sample(&in_sample(50)).unwrap();

    assert_eq!(report.table.len(), 50);
    assert_eq!(backend.calls(), 100);
    assert_eq!(report.table.records().last().unwrap().iteration, 49);

    match report.outcome {
        StabilityOutcome::Stable {
            scenarios,
            iteration,
            difference,
        } => {
            assert!(scenarios >= 2);
            assert!(scenarios <= 2 + 49);
            // every iteration before the stable one grew the count by one
            assert_eq!(scenarios, 2 + iteration);
            assert_eq!(report.table.records()[iteration].difference, difference);
            assert_eq!(report.final_state, SearchState::Stable);
        }
        StabilityOutcome::NoStableScenario => {
            assert_eq!(report.final_state, SearchState::Exhausted);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_in_sample_differences_are_non_negative() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::new(catalog.num_products());
    let report = StabilityEstimator::new(&catalog, generator(), &backend)
        .in_sample(&in_sample(10))
        .unwrap();

    assert!(report.table.records().iter().all(|r| r.difference >= 0.0));
    assert_eq!(report.backend, "revenue");
    assert!(report.reference_objective.is_none());
}

#[test]
fn test_in_sample_parallel_matches_sequential() {
    let catalog = Catalog::reference().unwrap();
    let parallel_backend = RevenueBackend::new(catalog.num_products());
    let sequential_backend = RevenueBackend::new(catalog.num_products());

    let parallel = StabilityEstimator::new(&catalog, generator(), &parallel_backend)
        .in_sample(&in_sample(12))
        .unwrap();
    let sequential = StabilityEstimator::new(&catalog, generator(), &sequential_backend)
        .in_sample(&StabilityConfig {
            parallel: false,
            ..in_sample(12)
        })
        .unwrap();

    assert_eq!(parallel.table, sequential.table);
    assert_eq!(parallel.outcome, sequential.outcome);
}

#[test]
fn test_in_sample_stops_at_first_failure() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::failing_at(catalog.num_products(), 6);
    let report = StabilityEstimator::new(&catalog, generator(), &backend)
        .in_sample(&in_sample(50))
        .unwrap();

    let failed_at = match report.outcome {
        StabilityOutcome::Infeasible {
            iteration: Some(t),
            ..
        } => t,
        other => panic!("expected infeasible, got {:?}", other),
    };

    assert_eq!(report.final_state, SearchState::Infeasible);
    assert_eq!(report.table.len(), failed_at);
    assert!(report.table.records().iter().all(|r| r.scenarios < 6));
    // both draws of the failing iteration were attempted, nothing after it
    assert_eq!(backend.calls(), 2 * (failed_at + 1));
    assert_eq!(backend.largest_model(), 6);
}

#[test]
fn test_in_sample_invalid_config_solves_nothing() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::new(catalog.num_products());
    let estimator = StabilityEstimator::new(&catalog, generator(), &backend);

    let result = estimator.in_sample(&StabilityConfig {
        starting_scenarios: 0,
        ..in_sample(5)
    });
    assert!(result.is_err());
    assert_eq!(backend.calls(), 0);
}

#[test]
fn test_in_sample_zero_iterations() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::new(catalog.num_products());
    let report = StabilityEstimator::new(&catalog, generator(), &backend)
        .in_sample(&in_sample(0))
        .unwrap();

    assert!(report.table.is_empty());
    assert_eq!(report.outcome, StabilityOutcome::NoStableScenario);
    assert_eq!(backend.calls(), 0);
}

#[test]
fn test_custom_seed_policy_changes_draws() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::new(catalog.num_products());

    let default_seeds = StabilityEstimator::new(&catalog, generator(), &backend)
        .in_sample(&in_sample(3))
        .unwrap();
    let other_seeds = StabilityEstimator::new(&catalog, generator(), &backend)
        .with_seeds(SeedPolicy {
            first_stride: 7,
            second_stride: 11,
            second_offset: 3,
            reference_seed: 5,
        })
        .in_sample(&in_sample(3))
        .unwrap();

    assert_ne!(default_seeds.table.differences(), other_seeds.table.differences());
}

// =========================================================================
// Out-of-sample
// =========================================================================

#[test]
fn test_out_of_sample_solves_reference_once() {
    let catalog = Catalog::reference().unwrap();
    for max_iterations in [0, 1, 7] {
        let backend = RevenueBackend::new(catalog.num_products());
        let report = StabilityEstimator::new(&catalog, generator(), &backend)
            .out_of_sample(&out_of_sample(max_iterations))
            .unwrap();

        assert_eq!(backend.calls(), 1 + max_iterations);
        assert_eq!(report.table.len(), max_iterations);
        assert_eq!(report.reference_scenarios, Some(55));
        assert!(report.reference_objective.is_some());
    }
}

#[test]
fn test_out_of_sample_differences_use_fixed_reference() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::new(catalog.num_products());
    let seeds = SeedPolicy::default();
    let report = StabilityEstimator::new(&catalog, generator(), &backend)
        .out_of_sample(&out_of_sample(8))
        .unwrap();
    let reference = report.reference_objective.unwrap();

    let probe = RevenueBackend::new(catalog.num_products());
    let builder = AtoModelBuilder::new(&catalog);

    let reference_set = generator()
        .sample_set(55, catalog.num_products(), seeds.reference_seed)
        .unwrap();
    let expected_reference = probe
        .solve(builder.build(&reference_set).unwrap().model())
        .unwrap()
        .objective_value();
    assert_eq!(reference, expected_reference);

    for record in report.table.records() {
        let set = generator()
            .sample_set(record.scenarios, catalog.num_products(), seeds.first(record.iteration))
            .unwrap();
        let objective = probe
            .solve(builder.build(&set).unwrap().model())
            .unwrap()
            .objective_value();
        assert!((record.difference - (objective - reference).abs()).abs() < 1e-9);
    }
}

#[test]
fn test_out_of_sample_reference_failure() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::failing_at(catalog.num_products(), 55);
    let report = StabilityEstimator::new(&catalog, generator(), &backend)
        .out_of_sample(&out_of_sample(10))
        .unwrap();

    assert!(matches!(
        report.outcome,
        StabilityOutcome::Infeasible {
            iteration: None,
            ..
        }
    ));
    assert!(report.table.is_empty());
    assert!(report.reference_objective.is_none());
    assert_eq!(backend.calls(), 1);
}

#[test]
fn test_out_of_sample_uses_its_own_alpha() {
    let catalog = Catalog::reference().unwrap();
    let backend = RevenueBackend::new(catalog.num_products());
    let report = StabilityEstimator::new(&catalog, generator(), &backend)
        .out_of_sample(&out_of_sample(2))
        .unwrap();
    assert_eq!(report.alpha, 0.025);
    assert!((report.z_critical - 2.2414).abs() < 1e-3);
}

// =========================================================================
// Real backend on a small plant
// =========================================================================

fn small_plant() -> Catalog {
    Catalog::new(
        vec![
            Component {
                name: "Board".to_string(),
                fixed_cost: 20.0,
                processing_minutes: vec![2.0],
                gozinto: vec![1.0, 1.0],
            },
            Component {
                name: "Case".to_string(),
                fixed_cost: 10.0,
                processing_minutes: vec![1.0],
                gozinto: vec![1.0, 0.0],
            },
        ],
        vec![Machine {
            name: "Assembly".to_string(),
            daily_minutes: 60.0,
        }],
        vec![
            Product {
                name: "Desktop".to_string(),
                price: 50.0,
            },
            Product {
                name: "Module".to_string(),
                price: 30.0,
            },
        ],
    )
    .unwrap()
}

#[test]
fn test_in_sample_with_microlp() {
    let catalog = small_plant();
    let generator = ScenarioGenerator::new(&DemandDistribution {
        mean: 10.0,
        std_dev: 4.0,
        ..DemandDistribution::default()
    })
    .unwrap();

    let report = StabilityEstimator::new(&catalog, generator, MicroLpBackend::new())
        .in_sample(&in_sample(4))
        .unwrap();

    assert_eq!(report.table.len(), 4);
    assert_eq!(report.backend, "microlp");
    assert!(report.table.records().iter().all(|r| r.difference >= 0.0));
}

#[test]
fn test_in_sample_reference_catalog_with_microlp() {
    let catalog = Catalog::reference().unwrap();
    let report = StabilityEstimator::new(&catalog, generator(), MicroLpBackend::new())
        .in_sample(&in_sample(6))
        .unwrap();

    assert_eq!(report.table.len(), 6);
    assert_eq!(report.alpha, 0.008);
    assert!(report.table.records().iter().all(|r| r.scenarios >= 2));
    assert!(report.table.records().iter().all(|r| r.difference >= 0.0));

    match report.outcome {
        StabilityOutcome::Stable { scenarios, iteration, .. } => {
            assert_eq!(scenarios, 2 + iteration);
            assert!(scenarios <= 2 + 5);
        }
        StabilityOutcome::NoStableScenario => {
            assert_eq!(report.final_state, SearchState::Exhausted);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}
