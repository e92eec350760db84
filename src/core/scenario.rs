//! Demand scenarios and their reproducible generation
//!
//! Every draw builds its own `StdRng` from an explicit seed, so the same
//! `(count, products, seed)` triple always yields the same demand matrix and
//! independent draws can run on different threads.

use miette::Diagnostic;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when checking that scenario probabilities sum to one
const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// How a continuous demand draw becomes an integer quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// Drop the fractional part (toward zero)
    #[default]
    Truncate,
    /// Round to the nearest integer
    Round,
}

impl Rounding {
    fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::Truncate => value.trunc(),
            Rounding::Round => value.round(),
        }
    }
}

/// Parameters of the Normal demand distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandDistribution {
    pub mean: f64,
    pub std_dev: f64,
    #[serde(default)]
    pub rounding: Rounding,
}

impl Default for DemandDistribution {
    fn default() -> Self {
        Self {
            mean: 100.0,
            std_dev: 40.0,
            rounding: Rounding::Truncate,
        }
    }
}

/// One demand realization: a quantity per product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    demand: Vec<u32>,
}

impl Scenario {
    pub fn new(demand: Vec<u32>) -> Self {
        Self { demand }
    }

    pub fn demand(&self) -> &[u32] {
        &self.demand
    }

    /// Demand for a single product (0 when out of range)
    pub fn demand_for(&self, product: usize) -> u32 {
        self.demand.get(product).copied().unwrap_or(0)
    }

    pub fn num_products(&self) -> usize {
        self.demand.len()
    }
}

/// Ordered scenarios with one probability each
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
    probabilities: Vec<f64>,
}

impl ScenarioSet {
    /// Equally likely scenarios
    pub fn uniform(scenarios: Vec<Scenario>) -> Result<Self, ScenarioError> {
        if scenarios.is_empty() {
            return Err(ScenarioError::Empty);
        }
        check_rectangular(&scenarios)?;
        let p = 1.0 / scenarios.len() as f64;
        let probabilities = vec![p; scenarios.len()];
        Ok(Self {
            scenarios,
            probabilities,
        })
    }

    /// Scenarios with explicit probabilities
    pub fn with_probabilities(
        scenarios: Vec<Scenario>,
        probabilities: Vec<f64>,
    ) -> Result<Self, ScenarioError> {
        if scenarios.is_empty() {
            return Err(ScenarioError::Empty);
        }
        if scenarios.len() != probabilities.len() {
            return Err(ScenarioError::ProbabilityCount {
                scenarios: scenarios.len(),
                probabilities: probabilities.len(),
            });
        }
        check_rectangular(&scenarios)?;

        if let Some((index, &value)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(ScenarioError::InvalidProbability { index, value });
        }

        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ScenarioError::ProbabilitySum { sum });
        }

        Ok(Self {
            scenarios,
            probabilities,
        })
    }

    /// A deterministic set: one scenario with probability one
    pub fn single(scenario: Scenario) -> Self {
        Self {
            scenarios: vec![scenario],
            probabilities: vec![1.0],
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Iterate `(probability, scenario)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (f64, &Scenario)> {
        self.probabilities.iter().copied().zip(self.scenarios.iter())
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Number of products every scenario covers
    pub fn num_products(&self) -> usize {
        self.scenarios.first().map(Scenario::num_products).unwrap_or(0)
    }
}

/// Draws demand matrices from a Normal distribution
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    normal: Normal<f64>,
    rounding: Rounding,
}

impl ScenarioGenerator {
    pub fn new(distribution: &DemandDistribution) -> Result<Self, ScenarioError> {
        let invalid = || ScenarioError::InvalidDistribution {
            mean: distribution.mean,
            std_dev: distribution.std_dev,
        };
        if !distribution.mean.is_finite()
            || !distribution.std_dev.is_finite()
            || distribution.std_dev < 0.0
        {
            return Err(invalid());
        }
        let normal = Normal::new(distribution.mean, distribution.std_dev).map_err(|_| invalid())?;
        Ok(Self {
            normal,
            rounding: distribution.rounding,
        })
    }

    /// Draw `count` scenarios of `products` demands each
    ///
    /// Negative draws are clamped to zero.
    pub fn generate(&self, count: usize, products: usize, seed: u64) -> Vec<Scenario> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let demand = (0..products)
                    .map(|_| {
                        let draw = self.rounding.apply(self.normal.sample(&mut rng));
                        // `as` saturates, so huge draws cap at u32::MAX
                        draw.max(0.0) as u32
                    })
                    .collect();
                Scenario::new(demand)
            })
            .collect()
    }

    /// Draw a uniformly weighted scenario set
    pub fn sample_set(&self, count: usize, products: usize, seed: u64) -> Result<ScenarioSet, ScenarioError> {
        ScenarioSet::uniform(self.generate(count, products, seed))
    }

    /// Draw the single probability-one scenario of the expected-value baseline
    pub fn baseline(&self, products: usize, seed: u64) -> ScenarioSet {
        let scenario = self
            .generate(1, products, seed)
            .pop()
            .unwrap_or_else(|| Scenario::new(vec![0; products]));
        ScenarioSet::single(scenario)
    }
}

/// Errors raised while building scenario sets
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ScenarioError {
    #[error("invalid demand distribution: mean {mean}, standard deviation {std_dev}")]
    #[diagnostic(
        code(ato::scenario::distribution),
        help("the mean must be finite and the standard deviation finite and non-negative")
    )]
    InvalidDistribution { mean: f64, std_dev: f64 },

    #[error("a scenario set needs at least one scenario")]
    #[diagnostic(code(ato::scenario::empty))]
    Empty,

    #[error("{scenarios} scenarios but {probabilities} probabilities")]
    #[diagnostic(code(ato::scenario::probability_count))]
    ProbabilityCount { scenarios: usize, probabilities: usize },

    #[error("probability {value} of scenario {index} is not a valid probability")]
    #[diagnostic(code(ato::scenario::probability))]
    InvalidProbability { index: usize, value: f64 },

    #[error("scenario probabilities sum to {sum}, expected 1")]
    #[diagnostic(code(ato::scenario::probability_sum))]
    ProbabilitySum { sum: f64 },

    #[error("scenario {index} has {found} demands, expected {expected}")]
    #[diagnostic(code(ato::scenario::ragged))]
    RaggedDemand {
        index: usize,
        expected: usize,
        found: usize,
    },
}

fn check_rectangular(scenarios: &[Scenario]) -> Result<(), ScenarioError> {
    let expected = scenarios.first().map(Scenario::num_products).unwrap_or(0);
    match scenarios
        .iter()
        .enumerate()
        .find(|(_, s)| s.num_products() != expected)
    {
        Some((index, s)) => Err(ScenarioError::RaggedDemand {
            index,
            expected,
            found: s.num_products(),
        }),
        None => Ok(()),
    }
}
