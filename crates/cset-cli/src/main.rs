//! Cset - changeset deployment runner
//!
//! Usage:
//!   cset deploy <pattern>   # Validate and execute changeset files
//!   cset plan <pattern>     # Show which files would run, in order

mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cset_core::api::HttpApi;
use cset_core::config::{DeployConfig, global_config_path, load_layered, project_config_path};
use cset_core::files::FileResolver;
use cset_core::options::ExecutionStrategy;
use cset_core::orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "cset")]
#[command(about = "Validate and execute changeset files against a changeset service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and execute changeset files, one at a time
    Deploy(Box<DeployArgs>),

    /// Resolve a pattern and list the files in processing order
    Plan(PlanArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct ConfigArgs {
    /// Config file (default: ./cset.toml if present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Skip the global config file
    #[arg(long)]
    no_global_config: bool,
}

#[derive(Args)]
struct PlanArgs {
    /// Changeset path or glob (e.g. "changesets/*.{yaml,json}")
    #[arg(env = "CSET_PATTERN")]
    pattern: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct DeployArgs {
    /// Changeset path or glob (e.g. "changesets/*.{yaml,json}")
    #[arg(env = "CSET_PATTERN")]
    pattern: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Base URL of the changeset service
    #[arg(long, env = "CSET_BASE_URL")]
    base_url: Option<String>,

    /// API key for the changeset service
    #[arg(long, env = "CSET_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Target environment id or name
    #[arg(long, short = 'e', env = "CSET_ENVIRONMENT")]
    environment: Option<String>,

    /// How files are sequenced (per_file, validate_first)
    #[arg(long)]
    strategy: Option<ExecutionStrategy>,

    /// Validate each file before executing it
    #[arg(long, conflicts_with = "no_validate")]
    validate: bool,

    /// Execute without validating first
    #[arg(long)]
    no_validate: bool,

    /// Only validate, never execute
    #[arg(long)]
    validate_only: bool,

    /// Return as soon as execution is submitted
    #[arg(long)]
    no_wait: bool,

    /// Budget per remote operation, in minutes
    #[arg(long)]
    timeout_minutes: Option<u64>,

    /// Stop at the first failed file
    #[arg(long, conflicts_with = "no_fail_fast")]
    fail_fast: bool,

    /// Keep going after a failed file
    #[arg(long)]
    no_fail_fast: bool,

    /// Variables to inject, one KEY=VALUE per line
    #[arg(long, env = "CSET_VARIABLES", hide_env_values = true)]
    variables: Option<String>,

    /// Append status/results outputs to this file
    #[arg(long, env = "GITHUB_OUTPUT")]
    output_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

impl DeployArgs {
    /// Flags and environment variables as the top config layer.
    fn overrides(&self) -> DeployConfig {
        DeployConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            environment: self.environment.clone(),
            pattern: self.pattern.clone(),
            validate: toggle(self.validate, self.no_validate),
            validate_only: self.validate_only.then_some(true),
            wait: self.no_wait.then_some(false),
            timeout_minutes: self.timeout_minutes,
            strategy: self.strategy,
            fail_fast: toggle(self.fail_fast, self.no_fail_fast),
            variables: self.variables.clone(),
        }
    }
}

fn toggle(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cset=info,cset_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy(args) => run_deploy(*args),
        Commands::Plan(args) => run_plan(args),
    }
}

fn load_config(args: &ConfigArgs) -> Result<DeployConfig> {
    let global = if args.no_global_config {
        None
    } else {
        global_config_path()
    };
    let (project, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            (project_config_path(&cwd), false)
        }
    };
    Ok(load_layered(global.as_deref(), &project, required)?)
}

/// Resolve relative patterns against the config file's directory when one
/// was named, otherwise against the working directory.
fn resolver_for(args: &ConfigArgs) -> Result<FileResolver> {
    let config_dir = args
        .config
        .as_deref()
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty());
    match config_dir {
        Some(dir) => Ok(FileResolver::new(dir)),
        None => Ok(FileResolver::from_current_dir()?),
    }
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    config.merge(DeployConfig {
        pattern: args.pattern.clone(),
        ..Default::default()
    });

    let files = resolver_for(&args.config)?.resolve(config.require_pattern()?)?;

    match args.format {
        OutputFormat::Table => output::print_plan_table(&files),
        OutputFormat::Json => output::print_plan_json(&files)?,
    }
    Ok(())
}

fn run_deploy(args: DeployArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    config.merge(args.overrides());

    let options = config.to_options()?;
    let files = resolver_for(&args.config)?.resolve(config.require_pattern()?)?;

    tracing::info!(
        files = files.len(),
        base_url = %options.base_url,
        environment = options.environment.as_deref().unwrap_or("-"),
        "Resolved changeset files"
    );

    let api = HttpApi::new(options.base_url.clone(), options.api_key.clone())?;
    let orchestrator = Orchestrator::new(Arc::new(api), options);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let report = runtime.block_on(orchestrator.run(&files));

    match args.format {
        OutputFormat::Table => output::print_report_table(&report),
        OutputFormat::Json => output::print_report_json(&report)?,
    }

    if let Some(path) = &args.output_file {
        output::append_step_outputs(path, &report)?;
    }

    report.ensure_success()?;
    Ok(())
}
