//! Project discovery and structure

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::catalog::{Catalog, CatalogError};

/// Directory marking a project root
pub const PROJECT_DIR: &str = ".ato";

/// Catalog directory written by `ato init`, relative to the root
pub const DATA_DIR: &str = "data";

/// Represents an ATO project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .ato/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a project at `path` holding a copy of the reference catalog
    ///
    /// With `force` an existing project is overwritten.
    pub fn init(path: &Path, force: bool) -> Result<Self, ProjectError> {
        std::fs::create_dir_all(path).map_err(|e| ProjectError::IoError(e.to_string()))?;
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let ato_dir = root.join(PROJECT_DIR);
        if ato_dir.exists() && !force {
            return Err(ProjectError::AlreadyExists(root));
        }

        std::fs::create_dir_all(&ato_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(ato_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Catalog::reference()?.write_dir(&root.join(DATA_DIR))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# ATO Project Configuration

# Catalog directory (components_data.csv, products_machines.csv)
catalog: data

# Days per planning week; weekly capacity = daily minutes x operating days
# operating_days: 7

# Demand distribution: Normal(mean, std_dev), truncated or rounded to integers
# demand_mean: 100
# demand_std_dev: 40
# rounding: truncate

# Solve the two in-sample models of an iteration concurrently
# parallel: true

# Seed of the expected-value baseline scenario
# baseline_seed: 42

# in_sample:
#   starting_scenarios: 2
#   max_iterations: 50
#   step: 1
#   alpha: 0.008

# out_of_sample:
#   starting_scenarios: 2
#   max_iterations: 50
#   step: 1
#   alpha: 0.025
#   reference_scenarios: 55

# seeds:
#   first_stride: 42
#   second_stride: 84
#   second_offset: 1
#   reference_seed: 1
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .ato configuration directory
    pub fn ato_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.ato_dir().join("config.yaml")
    }

    /// Catalog directory created by `init`
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("not an ATO project (searched from {searched_from:?})")]
    #[diagnostic(code(ato::project::not_found), help("run 'ato init' to create one"))]
    NotFound { searched_from: PathBuf },

    #[error("ATO project already exists at {0:?}")]
    #[diagnostic(code(ato::project::exists), help("use --force to overwrite it"))]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    #[diagnostic(code(ato::project::io))]
    IoError(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),
}
