//! `ato solve` command - Solve the expected-value or SAA model

use console::style;
use miette::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::helpers::RunContext;
use crate::cli::output::{number, render_structured, write_output, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{AtoModelBuilder, AtoPlan, Catalog, MicroLpBackend, OptimizationBackend, ScenarioSet};

#[derive(clap::Args, Debug)]
pub struct SolveArgs {
    /// Draw this many equally likely scenarios (default: the single-scenario baseline)
    #[arg(long, short = 'n')]
    pub scenarios: Option<usize>,

    /// Random seed of the demand draw (default: configured baseline seed)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also list components with zero procurement
    #[arg(long)]
    pub all: bool,
}

#[derive(Serialize)]
struct SolveReport<'a> {
    model: &'static str,
    scenarios: usize,
    seed: u64,
    expected_profit: f64,
    procurement: Vec<ProcurementLine<'a>>,
    machines: Vec<MachineLoad<'a>>,
    expected_assembly: Vec<AssemblyLine<'a>>,
}

#[derive(Serialize)]
struct ProcurementLine<'a> {
    component: &'a str,
    quantity: f64,
    cost: f64,
}

#[derive(Serialize)]
struct MachineLoad<'a> {
    machine: &'a str,
    used: f64,
    capacity: f64,
    utilization: f64,
}

#[derive(Serialize)]
struct AssemblyLine<'a> {
    product: &'a str,
    quantity: f64,
}

pub fn run(args: SolveArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = RunContext::load(global)?;
    let catalog = &ctx.catalog;
    let generator = ctx.generator()?;
    let seed = args.seed.unwrap_or_else(|| ctx.config.baseline_seed());

    let (model_kind, scenarios) = match args.scenarios {
        Some(count) => ("saa", generator.sample_set(count, catalog.num_products(), seed)?),
        None => ("baseline", generator.baseline(catalog.num_products(), seed)),
    };

    let ato = AtoModelBuilder::new(catalog).build(&scenarios)?;
    let backend = MicroLpBackend::new();
    info!(
        backend = backend.name(),
        variables = ato.model().variables().len(),
        constraints = ato.model().constraints().len(),
        "solving"
    );
    let solution = backend.solve(ato.model())?;
    let plan = ato.plan(&solution);
    plan.verify(catalog, &scenarios)?;

    let report = build_report(catalog, &scenarios, &plan, model_kind, seed);

    if global.format.is_structured() {
        return write_output(&render_structured(&report, global.format)?, None, global.quiet);
    }

    let mut procurement = Table::new(["component", "quantity", "cost"]);
    for line in report.procurement.iter().filter(|l| args.all || l.quantity > 0.0) {
        procurement.push_row([line.component.to_string(), number(line.quantity, 0), number(line.cost, 2)]);
    }

    if matches!(global.format, OutputFormat::Csv | OutputFormat::Tsv) {
        return write_output(&procurement.render(global.format)?, None, global.quiet);
    }

    let mut machines = Table::new(["machine", "used", "capacity", "utilization"]);
    for load in &report.machines {
        machines.push_row([
            load.machine.to_string(),
            number(load.used, 0),
            number(load.capacity, 0),
            format!("{}%", number(load.utilization * 100.0, 1)),
        ]);
    }

    let mut assembly = Table::new(["product", "expected_units"]);
    for line in &report.expected_assembly {
        assembly.push_row([line.product.to_string(), number(line.quantity, 2)]);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{} {} model, {} scenario(s), seed {}\n",
        style("Expected profit:").bold(),
        report.model,
        report.scenarios,
        report.seed
    ));
    out.push_str(&format!("  {}\n\n", style(number(report.expected_profit, 2)).green()));
    out.push_str(&procurement.render(global.format)?);
    out.push('\n');
    out.push_str(&machines.render(global.format)?);
    out.push('\n');
    out.push_str(&assembly.render(global.format)?);

    write_output(&out, None, global.quiet)
}

fn build_report<'a>(
    catalog: &'a Catalog,
    scenarios: &ScenarioSet,
    plan: &AtoPlan,
    model: &'static str,
    seed: u64,
) -> SolveReport<'a> {
    let procurement = catalog
        .components()
        .iter()
        .zip(&plan.procurement)
        .map(|(component, &quantity)| ProcurementLine {
            component: &component.name,
            quantity,
            cost: quantity * component.fixed_cost,
        })
        .collect();

    let machines = catalog
        .machines()
        .iter()
        .enumerate()
        .map(|(m, machine)| {
            let used = plan.machine_load(catalog, m);
            let capacity = catalog.weekly_capacity(m);
            MachineLoad {
                machine: &machine.name,
                used,
                capacity,
                utilization: if capacity > 0.0 { used / capacity } else { 0.0 },
            }
        })
        .collect();

    let expected_assembly = catalog
        .products()
        .iter()
        .zip(plan.expected_assembly(scenarios))
        .map(|(product, quantity)| AssemblyLine {
            product: &product.name,
            quantity,
        })
        .collect();

    SolveReport {
        model,
        scenarios: scenarios.len(),
        seed,
        expected_profit: plan.expected_profit,
        procurement,
        machines,
        expected_assembly,
    }
}
