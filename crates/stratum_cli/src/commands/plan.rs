//! Plan command - Show the workspace changes applying a block would make.

use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use stratum_config::{ConfigLayers, EnvConfiguration};
use stratum_core::{Engine, Plan, RunContext};
use stratum_workspace::{apply_changes, ChangeAction, WorkspaceConfig};
use tracing::{info, warn};

use super::{
    load_catalog, load_config, ContextArgs, InvalidInput, OutputFormat, ValidationFailed,
};

#[derive(Args)]
pub struct PlanArgs {
    /// Base configuration file
    #[arg(short, long)]
    pub file: String,

    /// Block to plan
    #[arg(short, long)]
    pub block: String,

    #[command(flatten)]
    pub context: ContextArgs,

    /// Persisted workspace state (YAML); an empty workspace when omitted
    #[arg(long)]
    pub current: Option<String>,

    /// Per-environment override file, as ENV=FILE
    #[arg(long = "env-override", value_name = "ENV=FILE")]
    pub env_overrides: Vec<String>,

    /// Override file shared by all preview environments
    #[arg(long)]
    pub preview_override: Option<String>,

    /// Replay the planned changes onto the current workspace and print the result
    #[arg(long)]
    pub apply_preview: bool,

    /// Output format for the plan
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn execute(args: PlanArgs) -> Result<()> {
    let stdout = io::stdout();
    run(&args, &mut stdout.lock()).map(|_| ())
}

fn run(args: &PlanArgs, out: &mut dyn Write) -> Result<Plan> {
    info!("Planning block {} from {}", args.block, args.file);

    let catalog = load_catalog(&args.context.catalog)?;
    let engine = Engine::from_catalog(&catalog);
    let ctx = args.context.run_context();

    let layers = load_layers(args, &engine, &ctx)?;
    let current = load_current(args.current.as_deref())?;

    let plan = engine
        .plan(&ctx, &layers, &args.block, &current)
        .with_context(|| format!("Failed to plan block {}", args.block))?;

    match args.format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&plan)?)?,
        OutputFormat::Text => print_plan(&plan, out)?,
    }

    if args.apply_preview {
        let mut applied = current.clone();
        apply_changes(&mut applied, plan.changes.ordered())
            .context("Failed to replay planned changes")?;
        if applied != plan.desired {
            warn!("Replayed workspace differs from planned state for {}", args.block);
        }
        writeln!(out, "---")?;
        write!(out, "{}", serde_yaml::to_string(&applied)?)?;
    }

    Ok(plan)
}

/// Load the base tree and every override tree, each normalized and validated.
fn load_layers(args: &PlanArgs, engine: &Engine<'_>, ctx: &RunContext) -> Result<ConfigLayers> {
    let mut base = load_config(&args.context.repo, &args.file)?;
    check(engine, ctx, &mut base)?;
    let mut layers = ConfigLayers::new(base);

    for entry in &args.env_overrides {
        let (env, path) = entry
            .split_once('=')
            .filter(|(env, path)| !env.is_empty() && !path.is_empty())
            .ok_or_else(|| InvalidInput(format!("expected ENV=FILE, got {:?}", entry)))?;
        let mut tree = load_config(&args.context.repo, path)?;
        check_override(engine, ctx, &mut tree)?;
        layers = layers.with_env_override(env, tree);
    }
    if let Some(path) = &args.preview_override {
        let mut tree = load_config(&args.context.repo, path)?;
        check_override(engine, ctx, &mut tree)?;
        layers = layers.with_preview_override(tree);
    }
    Ok(layers)
}

fn check(engine: &Engine<'_>, ctx: &RunContext, config: &mut EnvConfiguration) -> Result<()> {
    let errors = engine.check(ctx, config)?;
    if errors.is_empty() {
        return Ok(());
    }
    for error in errors.iter() {
        eprintln!("   - {}", error);
    }
    Err(ValidationFailed {
        count: errors.len(),
    }
    .into())
}

/// Override trees may omit modules, so only unresolvable connections
/// are fatal.
fn check_override(engine: &Engine<'_>, ctx: &RunContext, config: &mut EnvConfiguration) -> Result<()> {
    let errors = engine.check(ctx, config)?;
    let fatal: Vec<_> = errors
        .iter()
        .filter(|e| e.family == stratum_config::ErrorFamily::Normalize)
        .collect();
    if fatal.is_empty() {
        return Ok(());
    }
    for error in &fatal {
        eprintln!("   - {}", error);
    }
    Err(ValidationFailed { count: fatal.len() }.into())
}

fn load_current(path: Option<&str>) -> Result<WorkspaceConfig> {
    let Some(path) = path else {
        return Ok(WorkspaceConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspace {}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse workspace {}", path))
}

fn print_plan(plan: &Plan, out: &mut dyn Write) -> Result<()> {
    if plan.is_empty() {
        writeln!(out, "✅ {}: no changes", plan.block)?;
        return Ok(());
    }
    writeln!(out, "📋 {}: {} changes", plan.block, plan.changes.len())?;
    for change in plan.changes.ordered() {
        let marker = match change.action {
            ChangeAction::Add => '+',
            ChangeAction::Update => '~',
            ChangeAction::Delete => '-',
        };
        writeln!(out, "   {} {}", marker, change.key())?;
    }
    Ok(())
}
