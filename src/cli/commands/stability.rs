//! `ato stability` command - Scenario-count stability analysis

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::RunContext;
use crate::cli::output::{number, render_structured, write_output, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{
    MicroLpBackend, StabilityConfig, StabilityEstimator, StabilityOutcome, StabilityReport,
};

#[derive(Subcommand, Debug)]
pub enum StabilityCommands {
    /// Compare two independent scenario sets of equal size
    InSample(SearchArgs),

    /// Compare one scenario set against a large reference sample
    OutOfSample(OutOfSampleArgs),
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Starting number of scenarios
    #[arg(long)]
    pub start: Option<usize>,

    /// Maximum number of iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Scenarios added per iteration
    #[arg(long)]
    pub step: Option<usize>,

    /// Significance level of the confidence interval
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Solve the models of an iteration one after the other
    #[arg(long)]
    pub sequential: bool,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct OutOfSampleArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Size of the reference sample
    #[arg(long)]
    pub reference: Option<usize>,
}

impl SearchArgs {
    fn apply(&self, config: &mut StabilityConfig) {
        if let Some(start) = self.start {
            config.starting_scenarios = start;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(step) = self.step {
            config.step = step;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.sequential {
            config.parallel = false;
        }
    }
}

pub fn run(cmd: StabilityCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = RunContext::load(global)?;
    let estimator = StabilityEstimator::new(&ctx.catalog, ctx.generator()?, MicroLpBackend::new())
        .with_seeds(ctx.config.seed_policy());

    let (report, output) = match cmd {
        StabilityCommands::InSample(args) => {
            let mut config = ctx.config.in_sample_config();
            args.apply(&mut config);
            (estimator.in_sample(&config)?, args.output)
        }
        StabilityCommands::OutOfSample(args) => {
            let mut config = ctx.config.out_of_sample_config();
            args.search.apply(&mut config.search);
            if let Some(reference) = args.reference {
                config.reference_scenarios = reference;
            }
            (estimator.out_of_sample(&config)?, args.search.output)
        }
    };

    let content = render_report(&report, global.format)?;
    write_output(&content, output.as_deref(), global.quiet)
}

fn render_report(report: &StabilityReport, format: OutputFormat) -> Result<String> {
    if format.is_structured() {
        return render_structured(report, format);
    }

    let mut table = Table::new(["iteration", "scenarios", "difference"]);
    for record in report.table.records() {
        table.push_row([
            record.iteration.to_string(),
            record.scenarios.to_string(),
            number(record.difference, 4),
        ]);
    }

    if matches!(format, OutputFormat::Csv | OutputFormat::Tsv) {
        return table.render(format);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{} stability (alpha {}, z {})\n",
        report.analysis,
        report.alpha,
        number(report.z_critical, 4)
    ));
    if let Some(reference) = report.reference_objective {
        out.push_str(&format!(
            "Reference objective ({} scenarios): {}\n",
            report.reference_scenarios.unwrap_or_default(),
            number(reference, 2)
        ));
    }
    out.push('\n');
    if !table.is_empty() {
        out.push_str(&table.render(format)?);
        out.push('\n');
    }

    let outcome = match &report.outcome {
        StabilityOutcome::Stable {
            difference,
            iteration,
            ..
        } => format!(
            "{} {} (difference {} at iteration {})",
            style("✓").green(),
            style(&report.outcome).green(),
            number(*difference, 4),
            iteration
        ),
        StabilityOutcome::NoStableScenario => {
            format!("{} {}", style("!").yellow(), style(&report.outcome).yellow())
        }
        StabilityOutcome::Infeasible { iteration, reason } => {
            let at = match iteration {
                Some(t) => format!("iteration {}", t),
                None => "reference solve".to_string(),
            };
            format!(
                "{} {} ({}: {})",
                style("✗").red(),
                style(&report.outcome).red(),
                at,
                reason
            )
        }
    };
    out.push_str(&outcome);
    out.push('\n');
    Ok(out)
}
