//! Shared helper functions for CLI commands
//!
//! Project discovery, layered configuration and catalog loading are the same
//! for every command that touches the model.

use miette::Result;
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::core::{Catalog, Config, Project, ScenarioGenerator};

/// Project, configuration and catalog resolved for one invocation
pub struct RunContext {
    pub project: Option<Project>,
    pub config: Config,
    pub catalog: Catalog,
}

impl RunContext {
    /// Resolve from global options: `--project` or discovery, then config
    /// layers, then `--catalog` over the configured catalog
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let project = match &global.project {
            Some(path) => Some(Project::discover_from(path)?),
            None => Project::discover().ok(),
        };

        let mut config = Config::load_for(project.as_ref());
        if let Some(catalog) = &global.catalog {
            config.catalog = Some(catalog.clone());
        }

        let catalog = load_catalog(&config)?;
        Ok(Self {
            project,
            config,
            catalog,
        })
    }

    pub fn generator(&self) -> Result<ScenarioGenerator> {
        Ok(ScenarioGenerator::new(&self.config.demand_distribution())?)
    }
}

/// The configured catalog directory, or the embedded reference catalog
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = match &config.catalog {
        Some(dir) => {
            debug!(dir = %dir.display(), "loading catalog");
            Catalog::load_dir(dir)?
        }
        None => {
            debug!("using reference catalog");
            Catalog::reference()?
        }
    };
    match config.operating_days {
        Some(days) => Ok(catalog.with_operating_days(days)?),
        None => Ok(catalog),
    }
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Counts characters, not bytes.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_load_catalog_defaults_to_reference() {
        let catalog = load_catalog(&Config::default()).unwrap();
        assert_eq!(catalog.num_components(), 33);
    }

    #[test]
    fn test_load_catalog_applies_operating_days() {
        let config = Config {
            operating_days: Some(5),
            ..Config::default()
        };
        let catalog = load_catalog(&config).unwrap();
        assert_eq!(catalog.operating_days(), 5);
        assert_eq!(catalog.weekly_capacity(0), catalog.machines()[0].daily_minutes * 5.0);
    }

    #[test]
    fn test_load_catalog_reports_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            catalog: Some(tmp.path().join("missing")),
            ..Config::default()
        };
        assert!(load_catalog(&config).is_err());
    }
}
