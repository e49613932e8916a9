//! Validate command - Normalize and validate a configuration file.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use stratum_config::ValidationErrors;
use stratum_core::Engine;
use tracing::info;

use super::{load_catalog, load_config, ContextArgs, OutputFormat, ValidationFailed};

#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file to validate
    #[arg(short, long)]
    pub file: String,

    #[command(flatten)]
    pub context: ContextArgs,

    /// Output format for findings
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let stdout = io::stdout();
    let errors = run(&args, &mut stdout.lock())?;
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailed {
            count: errors.len(),
        }
        .into())
    }
}

fn run(args: &ValidateArgs, out: &mut dyn Write) -> Result<ValidationErrors> {
    info!("Validating configuration: {}", args.file);

    let catalog = load_catalog(&args.context.catalog)?;
    let mut config = load_config(&args.context.repo, &args.file)?;

    let engine = Engine::from_catalog(&catalog);
    let errors = engine
        .check(&args.context.run_context(), &mut config)
        .with_context(|| format!("Failed to check {}", args.file))?;

    report(&errors, args.format, out)?;
    Ok(errors)
}

fn report(errors: &ValidationErrors, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let findings: Vec<_> = errors
                .iter()
                .map(|e| {
                    json!({
                        "location": e.context.to_string(),
                        "path": e.path.to_string(),
                        "family": e.family.to_string(),
                        "message": e.kind.to_string(),
                    })
                })
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&findings)?)?;
        }
        OutputFormat::Text if errors.is_empty() => {
            writeln!(out, "✅ Configuration is valid")?;
        }
        OutputFormat::Text => {
            writeln!(out, "❌ {} validation errors:", errors.len())?;
            for error in errors.iter() {
                writeln!(out, "   - {}", error)?;
            }
        }
    }
    Ok(())
}
