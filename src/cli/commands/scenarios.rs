//! `ato scenarios` command - Draw a demand matrix

use miette::Result;
use serde::Serialize;

use crate::cli::helpers::RunContext;
use crate::cli::output::{render_structured, write_output, Table};
use crate::cli::GlobalOpts;
use crate::core::{DemandDistribution, Scenario};

#[derive(clap::Args, Debug)]
pub struct ScenariosArgs {
    /// Number of scenarios to draw
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: usize,

    /// Random seed (default: configured baseline seed)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Serialize)]
struct ScenarioDraw<'a> {
    seed: u64,
    distribution: DemandDistribution,
    products: Vec<&'a str>,
    scenarios: Vec<Scenario>,
}

pub fn run(args: ScenariosArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = RunContext::load(global)?;
    let generator = ctx.generator()?;
    let seed = args.seed.unwrap_or_else(|| ctx.config.baseline_seed());

    let scenarios = generator.generate(args.count, ctx.catalog.num_products(), seed);

    if global.format.is_structured() {
        let draw = ScenarioDraw {
            seed,
            distribution: ctx.config.demand_distribution(),
            products: ctx.catalog.products().iter().map(|p| p.name.as_str()).collect(),
            scenarios,
        };
        return write_output(&render_structured(&draw, global.format)?, None, global.quiet);
    }

    let mut headers = vec!["scenario".to_string()];
    headers.extend(ctx.catalog.products().iter().map(|p| p.name.clone()));
    let mut table = Table::new(headers);
    for (s, scenario) in scenarios.iter().enumerate() {
        let mut row = vec![s.to_string()];
        row.extend(scenario.demand().iter().map(u32::to_string));
        table.push_row(row);
    }

    write_output(&table.render(global.format)?, None, global.quiet)
}
