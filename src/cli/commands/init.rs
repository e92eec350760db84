//! `ato init` command - Initialize a new ATO project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::catalog::{COMPONENTS_FILE, REGISTRY_FILE};
use crate::core::project::{Project, ProjectError, DATA_DIR, PROJECT_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Force initialization even if .ato/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    match Project::init(&path, args.force) {
        Ok(project) => {
            if global.quiet {
                return Ok(());
            }
            println!(
                "{} Initialized ATO project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!("  {} Review the plant data", style("ato catalog show").yellow());
            println!("  {} Solve the expected-value model", style("ato solve").yellow());
            println!(
                "  {} Find a stable scenario count",
                style("ato stability in-sample").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} ATO project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("ato init --force").yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        format!("{}/", PROJECT_DIR),
        format!("{}/config.yaml", PROJECT_DIR),
        format!("{}/", DATA_DIR),
        format!("{}/{}", DATA_DIR, COMPONENTS_FILE),
        format!("{}/{}", DATA_DIR, REGISTRY_FILE),
    ];

    for entry in &entries {
        if root.join(entry).exists() {
            let prefix = if entry.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(entry).dim());
        }
    }
}
