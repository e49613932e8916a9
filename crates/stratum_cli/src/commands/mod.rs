//! CLI command definitions.
//!
//! Each subcommand works from a configuration file plus a catalog file that
//! stands in for the module registry and stack topology.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stratum_config::EnvConfiguration;
use stratum_core::{RunContext, StaticCatalog};
use thiserror::Error;

pub mod plan;
pub mod validate;

/// Stratum - infrastructure configuration validation and planning
#[derive(Parser)]
#[command(name = "stratum")]
#[command(version, about = "Stratum - infrastructure configuration validation and planning")]
#[command(long_about = r#"
Stratum checks block configuration files against module manifests and plans
the changes applying them would make to persisted workspaces.

COMMANDS:
  validate  → Normalize connections and validate a configuration file
  plan      → Show the workspace changes for one block

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a configuration file
    Validate(validate::ValidateArgs),

    /// Plan workspace changes for one block
    Plan(plan::PlanArgs),
}

/// Where the configuration file lives and what it is checked against.
#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// Catalog file with modules, stacks and channels
    #[arg(short, long)]
    pub catalog: String,

    /// Organization name
    #[arg(long, env = "STRATUM_ORG")]
    pub org: String,

    /// Stack the configuration belongs to
    #[arg(long, env = "STRATUM_STACK")]
    pub stack: String,

    /// Environment the configuration is applied to
    #[arg(long, env = "STRATUM_ENV")]
    pub env: String,

    /// Treat the environment as a preview environment
    #[arg(long)]
    pub preview: bool,

    /// Repository name used in error locations
    #[arg(long, default_value = "local")]
    pub repo: String,
}

impl ContextArgs {
    pub fn run_context(&self) -> RunContext {
        RunContext::new(&self.org, &self.stack, &self.env).with_preview(self.preview)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The configuration has findings; they have already been printed.
#[derive(Error, Debug)]
#[error("validation failed with {count} errors")]
pub struct ValidationFailed {
    pub count: usize,
}

/// An argument value that could not be used.
#[derive(Error, Debug)]
#[error("invalid argument: {0}")]
pub struct InvalidInput(pub String);

pub fn load_catalog(path: &str) -> Result<StaticCatalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path))?;
    StaticCatalog::from_yaml_str(&content).with_context(|| format!("Failed to load catalog {}", path))
}

pub fn load_config(repo: &str, path: &str) -> Result<EnvConfiguration> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path))?;
    let filename = Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    EnvConfiguration::from_yaml_str(repo, filename, &content)
        .with_context(|| format!("Failed to parse configuration {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "stratum",
            "--verbose",
            "validate",
            "--file",
            "config.yml",
            "--catalog",
            "catalog.yml",
            "--org",
            "acme",
            "--stack",
            "core",
            "--env",
            "dev",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(!cli.json);
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn test_load_config_uses_file_name() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "networks:\n  main-network:\n    module: acme/aws-network").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = load_config("acme/infra", &path).unwrap();
        assert_eq!(config.repo_name, "acme/infra");
        assert!(!config.filename.contains('/'));
        assert!(config.find_block("main-network").is_some());
    }

    #[test]
    fn test_load_missing_catalog() {
        let err = load_catalog("/nonexistent/catalog.yml").unwrap_err();
        assert!(err.to_string().contains("Failed to read catalog"));
    }
}
