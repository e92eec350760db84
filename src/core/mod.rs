//! Core module - catalog, scenarios, model building and stability analysis

pub mod backend;
pub mod catalog;
pub mod config;
pub mod model;
pub mod project;
pub mod scenario;
pub mod stability;

pub use backend::{MicroLpBackend, OptimizationBackend, Solution, SolveError};
pub use catalog::{Catalog, CatalogError, Component, Machine, Product};
pub use config::Config;
pub use model::{
    AtoModel, AtoModelBuilder, AtoPlan, LinearConstraint, LinearExpr, ModelError, OptimizationModel,
    PlanViolation, Relation, Sense, VarId, VarSpec,
};
pub use project::{Project, ProjectError};
pub use scenario::{
    DemandDistribution, Rounding, Scenario, ScenarioError, ScenarioGenerator, ScenarioSet,
};
pub use stability::{
    Analysis, CltTest, ConfidenceInterval, OutOfSampleConfig, SearchState, SeedPolicy,
    StabilityConfig, StabilityError, StabilityEstimator, StabilityOutcome, StabilityRecord,
    StabilityReport, StabilityTable,
};
