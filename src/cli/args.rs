//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    catalog::CatalogCommands, completions::CompletionsArgs, init::InitArgs,
    scenarios::ScenariosArgs, solve::SolveArgs, stability::StabilityCommands,
};

#[derive(Parser)]
#[command(name = "ato")]
#[command(author, version, about = "Assemble-to-order capacity sizing")]
#[command(long_about = "Size component procurement for an assemble-to-order plant under uncertain demand \
using two-stage stochastic programming, and find how many demand scenarios make the \
sample average approximation stable.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project root (default: auto-detect by finding .ato/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// Catalog directory (default: project config, then the built-in reference catalog)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ATO project with the reference catalog
    Init(InitArgs),

    /// Inspect and validate the plant catalog
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Draw demand scenarios
    Scenarios(ScenariosArgs),

    /// Solve the expected-value or SAA model and print the plan
    Solve(SolveArgs),

    /// Scenario-count stability analysis (in-sample, out-of-sample)
    #[command(subcommand)]
    Stability(StabilityCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}

impl OutputFormat {
    /// Whether the format carries the full structured result
    pub fn is_structured(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Yaml)
    }
}
