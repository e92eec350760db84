//! Optimization backends
//!
//! The model builder and the stability estimators only see
//! [`OptimizationBackend`]; any MILP engine can sit behind it.

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution as _, SolverModel,
    Variable,
};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::core::model::{OptimizationModel, Relation, Sense, VarId};

/// Objective value and one value per model variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    objective_value: f64,
    values: Vec<f64>,
}

impl Solution {
    pub fn new(objective_value: f64, values: Vec<f64>) -> Self {
        Self {
            objective_value,
            values,
        }
    }

    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// Value of a variable; unknown ids read as zero
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Why a backend could not produce a solution
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SolveError {
    #[error("model is infeasible")]
    #[diagnostic(
        code(ato::backend::infeasible),
        help("check machine capacities and demand against the bill of materials")
    )]
    Infeasible,

    #[error("model is unbounded")]
    #[diagnostic(code(ato::backend::unbounded))]
    Unbounded,

    #[error("solver failed: {0}")]
    #[diagnostic(code(ato::backend::failed))]
    Backend(String),
}

/// A MILP engine able to solve an [`OptimizationModel`]
///
/// Implementations must be shareable across threads: the in-sample estimator
/// may solve two models at once.
pub trait OptimizationBackend: Send + Sync {
    fn solve(&self, model: &OptimizationModel) -> Result<Solution, SolveError>;

    /// Short name for logs and reports
    fn name(&self) -> &str {
        "backend"
    }
}

impl<B: OptimizationBackend + ?Sized> OptimizationBackend for &B {
    fn solve(&self, model: &OptimizationModel) -> Result<Solution, SolveError> {
        (**self).solve(model)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Branch and bound on the pure-Rust `microlp` engine, driven through `good_lp`
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpBackend;

impl MicroLpBackend {
    pub fn new() -> Self {
        Self
    }
}

impl OptimizationBackend for MicroLpBackend {
    fn solve(&self, model: &OptimizationModel) -> Result<Solution, SolveError> {
        let mut problem_vars = ProblemVariables::new();
        let lp_vars: Vec<Variable> = model
            .variables()
            .iter()
            .map(|spec| {
                let mut def = variable().name(spec.name.clone());
                if spec.lower.is_finite() {
                    def = def.min(spec.lower);
                }
                if let Some(upper) = spec.upper {
                    def = def.max(upper);
                }
                if spec.integer {
                    def = def.integer();
                }
                problem_vars.add(def)
            })
            .collect();

        let to_expression = |terms: &[(VarId, f64)]| -> Expression {
            terms
                .iter()
                .map(|&(var, coef)| coef * lp_vars[var.index()])
                .sum()
        };

        let objective = to_expression(model.objective().terms());
        let unsolved = match model.sense() {
            Sense::Maximize => problem_vars.maximise(objective),
            Sense::Minimize => problem_vars.minimise(objective),
        };
        let mut problem = unsolved.using(microlp);

        for c in model.constraints() {
            let lhs = to_expression(c.lhs.terms());
            // Expression constants move to the right-hand side
            let rhs = c.rhs - c.lhs.constant();
            problem = match c.relation {
                Relation::LessEq => problem.with(constraint!(lhs <= rhs)),
                Relation::GreaterEq => problem.with(constraint!(lhs >= rhs)),
                Relation::Equal => problem.with(constraint!(lhs == rhs)),
            };
        }

        let solved = problem.solve().map_err(|e| match e {
            ResolutionError::Infeasible => SolveError::Infeasible,
            ResolutionError::Unbounded => SolveError::Unbounded,
            other => SolveError::Backend(other.to_string()),
        })?;

        let values: Vec<f64> = model
            .variables()
            .iter()
            .zip(&lp_vars)
            .map(|(spec, &var)| {
                let value = solved.value(var);
                if spec.integer {
                    value.round()
                } else {
                    value
                }
            })
            .collect();
        let objective_value = model.objective().evaluate(&values);

        Ok(Solution::new(objective_value, values))
    }

    fn name(&self) -> &str {
        "microlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Catalog, Component, Machine, Product};
    use crate::core::model::{AtoModelBuilder, LinearConstraint, LinearExpr, VarSpec};
    use crate::core::scenario::{DemandDistribution, Scenario, ScenarioGenerator, ScenarioSet};

    /// One product built from one `Frame` and two `Bolt`s on a single machine
    fn tiny_catalog(frame_cost: f64, daily_minutes: f64) -> Catalog {
        Catalog::new(
            vec![
                Component {
                    name: "Frame".to_string(),
                    fixed_cost: frame_cost,
                    processing_minutes: vec![1.0],
                    gozinto: vec![1.0],
                },
                Component {
                    name: "Bolt".to_string(),
                    fixed_cost: 3.0,
                    processing_minutes: vec![1.0],
                    gozinto: vec![2.0],
                },
            ],
            vec![Machine {
                name: "Press".to_string(),
                daily_minutes,
            }],
            vec![Product {
                name: "Widget".to_string(),
                price: 10.0,
            }],
        )
        .unwrap()
        .with_operating_days(1)
        .unwrap()
    }

    fn solve_plan(catalog: &Catalog, set: &ScenarioSet) -> crate::core::model::AtoPlan {
        let ato = AtoModelBuilder::new(catalog).build(set).unwrap();
        let solution = MicroLpBackend::new().solve(ato.model()).unwrap();
        ato.plan(&solution)
    }

    #[test]
    fn test_meets_demand_when_capacity_allows() {
        let catalog = tiny_catalog(2.0, 100.0);
        let set = ScenarioSet::single(Scenario::new(vec![10]));
        let plan = solve_plan(&catalog, &set);

        assert_eq!(plan.assembly, vec![vec![10.0]]);
        assert_eq!(plan.procurement, vec![10.0, 20.0]);
        // 10 * 10 - (2 * 10 + 3 * 20)
        assert!((plan.expected_profit - 20.0).abs() < 1e-6);
        assert_eq!(plan.verify(&catalog, &set), Ok(()));
    }

    #[test]
    fn test_capacity_limits_procurement() {
        let catalog = tiny_catalog(2.0, 20.0);
        let set = ScenarioSet::single(Scenario::new(vec![10]));
        let plan = solve_plan(&catalog, &set);

        // three minutes per widget, twenty minutes available
        assert_eq!(plan.assembly, vec![vec![6.0]]);
        assert_eq!(plan.procurement, vec![6.0, 12.0]);
        assert!((plan.expected_profit - 12.0).abs() < 1e-6);
        assert_eq!(plan.verify(&catalog, &set), Ok(()));
    }

    #[test]
    fn test_raising_cost_never_raises_procurement() {
        let set = ScenarioSet::single(Scenario::new(vec![10]));
        let cheap = solve_plan(&tiny_catalog(2.0, 100.0), &set);
        let dear = solve_plan(&tiny_catalog(9.0, 100.0), &set);

        // 9 + 2 * 3 > 10: building no longer pays
        assert!(dear.procurement[0] <= cheap.procurement[0]);
        assert_eq!(dear.procurement[0], 0.0);
        assert!(dear.expected_profit.abs() < 1e-6);
    }

    #[test]
    fn test_shared_procurement_across_scenarios() {
        let catalog = tiny_catalog(2.0, 100.0);
        let set =
            ScenarioSet::uniform(vec![Scenario::new(vec![4]), Scenario::new(vec![10])]).unwrap();
        let plan = solve_plan(&catalog, &set);

        // Each kit costs 8 and earns 10 in scenarios that can use it:
        // the first 4 kits pay off, the next 6 only half the time
        assert_eq!(plan.procurement, vec![4.0, 8.0]);
        assert!((plan.expected_profit - 8.0).abs() < 1e-6);
        assert_eq!(plan.verify(&catalog, &set), Ok(()));
    }

    #[test]
    fn test_infeasible_model() {
        let mut model = OptimizationModel::new("conflict", Sense::Maximize);
        let x = model.add_variable(VarSpec::non_negative_integer("x"));
        model.set_objective(LinearExpr::new().with_term(x, 1.0));
        model.add_constraint(LinearConstraint::less_eq(
            "upper",
            LinearExpr::new().with_term(x, 1.0),
            3.0,
        ));
        model.add_constraint(LinearConstraint {
            name: "lower".to_string(),
            lhs: LinearExpr::new().with_term(x, 1.0),
            relation: Relation::GreaterEq,
            rhs: 5.0,
        });

        assert!(MicroLpBackend::new().solve(&model).is_err());
    }

    #[test]
    fn test_reference_baseline_is_profitable() {
        let catalog = Catalog::reference().unwrap();
        let generator = ScenarioGenerator::new(&DemandDistribution::default()).unwrap();
        let builder = AtoModelBuilder::new(&catalog);
        let ato = builder.build_baseline(&generator, 42).unwrap();

        let solution = MicroLpBackend::new().solve(ato.model()).unwrap();
        assert!(solution.objective_value() >= 0.0);

        let plan = ato.plan(&solution);
        let set = generator.baseline(catalog.num_products(), 42);
        assert_eq!(plan.verify(&catalog, &set), Ok(()));
    }

    #[test]
    fn test_borrowed_backend_delegates() {
        fn name_of<B: OptimizationBackend>(backend: B) -> String {
            backend.name().to_string()
        }

        let backend = MicroLpBackend::new();
        assert_eq!(name_of(&backend), "microlp");
    }
}
