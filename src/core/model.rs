//! Optimization model representation and the stochastic ATO model builder
//!
//! [`OptimizationModel`] is a solver-neutral linear model (variables, linear
//! objective, linear constraints). [`AtoModelBuilder`] fills one in from a
//! [`Catalog`] and a [`ScenarioSet`]:
//!
//! ```text
//! max  Σ_s p_s Σ_j price_j y[j,s]  -  Σ_i cost_i x[i]
//! s.t. Σ_i time[i,m] x[i]       <= weekly_capacity_m     (capacity[m])
//!      y[j,s]                   <= demand[s][j]          (demand_cap[j,s])
//!      Σ_j gozinto[i,j] y[j,s]  <= x[i]                  (gozinto[i,s])
//!      x, y >= 0 integer
//! ```
//!
//! `x` is the first-stage procurement shared by every scenario, `y` the
//! second-stage assembly decided once demand is known.

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::core::backend::Solution;
use crate::core::catalog::Catalog;
use crate::core::scenario::{ScenarioError, ScenarioGenerator, ScenarioSet};

/// Absolute slack allowed when checking a plan against its constraints
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Handle to a variable inside an [`OptimizationModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Declaration of a decision variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarSpec {
    pub name: String,
    pub lower: f64,
    pub upper: Option<f64>,
    pub integer: bool,
}

impl VarSpec {
    /// A non-negative integer variable without upper bound
    pub fn non_negative_integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: 0.0,
            upper: None,
            integer: true,
        }
    }
}

/// `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coef·var`; zero coefficients are dropped
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Value of the expression for a full variable assignment
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    /// Coefficient of `var`, summing repeated terms
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| c)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

/// `lhs (<=|>=|==) rhs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub name: String,
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn less_eq(name: impl Into<String>, lhs: LinearExpr, rhs: f64) -> Self {
        Self {
            name: name.into(),
            lhs,
            relation: Relation::LessEq,
            rhs,
        }
    }

    /// Whether the assignment satisfies the constraint within `tolerance`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs.evaluate(values);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + tolerance,
            Relation::GreaterEq => lhs >= self.rhs - tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Maximize,
    Minimize,
}

/// A linear (mixed-integer) program handed to an optimization backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationModel {
    name: String,
    sense: Sense,
    objective: LinearExpr,
    constraints: Vec<LinearConstraint>,
    variables: Vec<VarSpec>,
}

impl OptimizationModel {
    pub fn new(name: impl Into<String>, sense: Sense) -> Self {
        Self {
            name: name.into(),
            sense,
            objective: LinearExpr::new(),
            constraints: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn add_variable(&mut self, spec: VarSpec) -> VarId {
        self.variables.push(spec);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn variables(&self) -> &[VarSpec] {
        &self.variables
    }

    /// Constraints whose name starts with `family` (e.g. `"gozinto"`)
    pub fn constraints_named<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| c.name.split('[').next() == Some(family))
    }

    /// Names of constraints violated by the assignment
    pub fn violated_constraints(&self, values: &[f64], tolerance: f64) -> Vec<&str> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values, tolerance))
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Errors raised while building an ATO model
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum ModelError {
    #[error("scenario {scenario} has {found} demands but the catalog has {expected} products")]
    #[diagnostic(code(ato::model::demand_dimension))]
    DemandDimension {
        scenario: usize,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scenario(#[from] ScenarioError),
}

/// An ATO program together with the layout of its variables
#[derive(Debug, Clone)]
pub struct AtoModel {
    model: OptimizationModel,
    procurement: Vec<VarId>,
    assembly: Vec<Vec<VarId>>,
}

impl AtoModel {
    pub fn model(&self) -> &OptimizationModel {
        &self.model
    }

    /// `x[i]`, one per component
    pub fn procurement_vars(&self) -> &[VarId] {
        &self.procurement
    }

    /// `y[j,s]`, indexed `[scenario][product]`
    pub fn assembly_vars(&self) -> &[Vec<VarId>] {
        &self.assembly
    }

    pub fn num_scenarios(&self) -> usize {
        self.assembly.len()
    }

    /// Read a backend solution back into component and product quantities
    pub fn plan(&self, solution: &Solution) -> AtoPlan {
        let procurement = self
            .procurement
            .iter()
            .map(|&var| solution.value(var))
            .collect();
        let assembly = self
            .assembly
            .iter()
            .map(|row| row.iter().map(|&var| solution.value(var)).collect())
            .collect();
        AtoPlan {
            expected_profit: solution.objective_value(),
            procurement,
            assembly,
        }
    }
}

/// Builds [`AtoModel`]s over a fixed catalog
#[derive(Debug, Clone, Copy)]
pub struct AtoModelBuilder<'a> {
    catalog: &'a Catalog,
}

impl<'a> AtoModelBuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Formulate the two-stage program for an explicit scenario set
    pub fn build(&self, scenarios: &ScenarioSet) -> Result<AtoModel, ModelError> {
        let catalog = self.catalog;
        let num_products = catalog.num_products();

        if scenarios.is_empty() {
            return Err(ScenarioError::Empty.into());
        }
        if let Some((scenario, s)) = scenarios
            .scenarios()
            .iter()
            .enumerate()
            .find(|(_, s)| s.num_products() != num_products)
        {
            return Err(ModelError::DemandDimension {
                scenario,
                expected: num_products,
                found: s.num_products(),
            });
        }

        let mut model = OptimizationModel::new("ato", Sense::Maximize);

        let procurement: Vec<VarId> = (0..catalog.num_components())
            .map(|i| model.add_variable(VarSpec::non_negative_integer(format!("x[{}]", i))))
            .collect();
        let assembly: Vec<Vec<VarId>> = (0..scenarios.len())
            .map(|s| {
                (0..num_products)
                    .map(|j| model.add_variable(VarSpec::non_negative_integer(format!("y[{},{}]", j, s))))
                    .collect()
            })
            .collect();

        // Expected revenue minus procurement cost paid up front
        let mut objective = LinearExpr::new();
        for (s, (probability, _)) in scenarios.iter().enumerate() {
            for (j, product) in catalog.products().iter().enumerate() {
                objective.add_term(assembly[s][j], probability * product.price);
            }
        }
        for (component, &x) in catalog.components().iter().zip(&procurement) {
            objective.add_term(x, -component.fixed_cost);
        }
        model.set_objective(objective);

        for m in 0..catalog.num_machines() {
            let mut lhs = LinearExpr::new();
            for (component, &x) in catalog.components().iter().zip(&procurement) {
                lhs.add_term(x, component.processing_time(m));
            }
            model.add_constraint(LinearConstraint::less_eq(
                format!("capacity[{}]", m),
                lhs,
                catalog.weekly_capacity(m),
            ));
        }

        for (s, scenario) in scenarios.scenarios().iter().enumerate() {
            for j in 0..num_products {
                model.add_constraint(LinearConstraint::less_eq(
                    format!("demand_cap[{},{}]", j, s),
                    LinearExpr::new().with_term(assembly[s][j], 1.0),
                    f64::from(scenario.demand_for(j)),
                ));
            }
        }

        for (i, component) in catalog.components().iter().enumerate() {
            for (s, row) in assembly.iter().enumerate() {
                let mut lhs = LinearExpr::new();
                for (j, &y) in row.iter().enumerate() {
                    lhs.add_term(y, component.gozinto_factor(j));
                }
                lhs.add_term(procurement[i], -1.0);
                model.add_constraint(LinearConstraint::less_eq(format!("gozinto[{},{}]", i, s), lhs, 0.0));
            }
        }

        Ok(AtoModel {
            model,
            procurement,
            assembly,
        })
    }

    /// The deterministic expected-value model: one drawn scenario, probability one
    pub fn build_baseline(&self, generator: &ScenarioGenerator, seed: u64) -> Result<AtoModel, ModelError> {
        let scenarios = generator.baseline(self.catalog.num_products(), seed);
        self.build(&scenarios)
    }
}

/// Procurement and assembly quantities read from a solution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtoPlan {
    pub expected_profit: f64,

    /// Units procured per component
    pub procurement: Vec<f64>,

    /// Units assembled, indexed `[scenario][product]`
    pub assembly: Vec<Vec<f64>>,
}

impl AtoPlan {
    /// Minutes used on machine `m`
    pub fn machine_load(&self, catalog: &Catalog, m: usize) -> f64 {
        catalog
            .components()
            .iter()
            .zip(&self.procurement)
            .map(|(c, x)| c.processing_time(m) * x)
            .sum()
    }

    /// Expected units assembled per product
    pub fn expected_assembly(&self, scenarios: &ScenarioSet) -> Vec<f64> {
        let products = self.assembly.first().map(Vec::len).unwrap_or(0);
        let mut expected = vec![0.0; products];
        for ((probability, _), row) in scenarios.iter().zip(&self.assembly) {
            for (total, y) in expected.iter_mut().zip(row) {
                *total += probability * y;
            }
        }
        expected
    }

    /// Check the capacity, demand-cap and bill-of-materials invariants
    pub fn verify(&self, catalog: &Catalog, scenarios: &ScenarioSet) -> Result<(), PlanViolation> {
        for (i, &x) in self.procurement.iter().enumerate() {
            if x < -FEASIBILITY_TOLERANCE {
                return Err(PlanViolation::NegativeProcurement {
                    component: catalog.components()[i].name.clone(),
                    quantity: x,
                });
            }
        }

        for (m, machine) in catalog.machines().iter().enumerate() {
            let used = self.machine_load(catalog, m);
            let capacity = catalog.weekly_capacity(m);
            if used > capacity + FEASIBILITY_TOLERANCE {
                return Err(PlanViolation::Capacity {
                    machine: machine.name.clone(),
                    used,
                    capacity,
                });
            }
        }

        for (s, (scenario, row)) in scenarios.scenarios().iter().zip(&self.assembly).enumerate() {
            for (j, &y) in row.iter().enumerate() {
                let demand = f64::from(scenario.demand_for(j));
                if y < -FEASIBILITY_TOLERANCE || y > demand + FEASIBILITY_TOLERANCE {
                    return Err(PlanViolation::DemandCap {
                        product: catalog.products()[j].name.clone(),
                        scenario: s,
                        assembled: y,
                        demand,
                    });
                }
            }

            for (component, &x) in catalog.components().iter().zip(&self.procurement) {
                let consumed: f64 = row
                    .iter()
                    .enumerate()
                    .map(|(j, y)| component.gozinto_factor(j) * y)
                    .sum();
                if consumed > x + FEASIBILITY_TOLERANCE {
                    return Err(PlanViolation::BillOfMaterials {
                        component: component.name.clone(),
                        scenario: s,
                        consumed,
                        procured: x,
                    });
                }
            }
        }

        Ok(())
    }
}

/// A broken invariant found by [`AtoPlan::verify`]
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum PlanViolation {
    #[error("component '{component}' has negative procurement {quantity}")]
    #[diagnostic(code(ato::model::negative))]
    NegativeProcurement { component: String, quantity: f64 },

    #[error("machine '{machine}' loaded {used} minutes, capacity {capacity}")]
    #[diagnostic(code(ato::model::capacity))]
    Capacity {
        machine: String,
        used: f64,
        capacity: f64,
    },

    #[error("scenario {scenario}: '{product}' assembled {assembled} units, demand {demand}")]
    #[diagnostic(code(ato::model::demand_cap))]
    DemandCap {
        product: String,
        scenario: usize,
        assembled: f64,
        demand: f64,
    },

    #[error("scenario {scenario}: '{component}' consumed {consumed} units, procured {procured}")]
    #[diagnostic(code(ato::model::gozinto))]
    BillOfMaterials {
        component: String,
        scenario: usize,
        consumed: f64,
        procured: f64,
    },
}
