use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use hedera_stage::command::{CommandRunner, DryRunRunner, SystemRunner};
use hedera_stage::error::BuildError;
use hedera_stage::manifest::{build_manifest, write_manifest};
use hedera_stage::observability::{MetricsCollector, log_snapshot};
use hedera_stage::plan::{StagePlan, write_plan};
use hedera_stage::stager::Stager;
use hedera_stage::validation::validate_plan;
use serde_json::to_writer_pretty;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = configure_tracing() {
        eprintln!("warning: failed to initialise logging: {err}");
    }

    let result = match cli.command {
        Some(Commands::Run(args)) => run_stage(args),
        Some(Commands::Validate { plan }) => validate_plan_cmd(plan),
        Some(Commands::Targets { plan }) => list_targets(plan),
        Some(Commands::PlanInit { output }) => init_plan(output),
        None => run_stage(RunArgs::default()),
    };

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
        let code = err
            .downcast_ref::<BuildError>()
            .map(BuildError::exit_code)
            .unwrap_or(1);
        exit(code);
    }
}

fn configure_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout is reserved for command echoes and tool output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(())
}

fn load_plan(path: Option<&PathBuf>) -> Result<StagePlan> {
    match path {
        Some(path) => StagePlan::load(path),
        None => Ok(StagePlan::default()),
    }
}

fn run_stage(args: RunArgs) -> Result<()> {
    let mut plan = load_plan(args.plan.as_ref())?;
    if !args.targets.is_empty() {
        plan = plan.with_targets(args.targets.iter().map(String::as_str));
    }
    if args.add_targets {
        plan.add_targets = true;
    }

    let report = validate_plan(&plan);
    for warning in &report.warnings {
        warn!("{warning}");
    }
    if !report.is_ok() {
        for error_msg in &report.errors {
            error!("{error_msg}");
        }
        bail!(
            "Stage plan validation failed with {} error(s)",
            report.errors.len()
        );
    }

    let metrics = if args.dry_run {
        stage_with(&plan, DryRunRunner)?
    } else {
        stage_with(&plan, SystemRunner)?
    };
    info!(targets = plan.targets.len(), "Staging completed");

    if args.print_metrics || args.metrics_json.is_some() {
        let snapshot = metrics.snapshot();
        if args.print_metrics {
            log_snapshot(&snapshot);
        }
        if let Some(path) = args.metrics_json {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create metrics directory: {}", parent.display())
                })?;
            }
            let file = File::create(&path)
                .with_context(|| format!("Failed to create metrics file: {}", path.display()))?;
            to_writer_pretty(file, &snapshot)
                .with_context(|| format!("Failed to write metrics JSON: {}", path.display()))?;
            info!(metrics = %path.display(), "Metrics JSON written");
        }
    }

    if let Some(path) = args.manifest {
        if args.dry_run {
            warn!(
                manifest = %path.display(),
                "Dry run produced no archives; manifest not written"
            );
        } else {
            let manifest = build_manifest(&plan, &plan.targets)?;
            write_manifest(&manifest, &path)?;
            info!(manifest = %path.display(), "Staging manifest written");
        }
    }

    Ok(())
}

fn stage_with<R: CommandRunner>(
    plan: &StagePlan,
    runner: R,
) -> Result<MetricsCollector, BuildError> {
    let stdout = io::stdout();
    let mut stager = Stager::new(plan, runner, stdout.lock());
    stager.run_plan()?;
    Ok(stager.metrics())
}

fn validate_plan_cmd(path: PathBuf) -> Result<()> {
    let plan = StagePlan::load(&path)?;
    let report = validate_plan(&plan);

    for warning in &report.warnings {
        warn!(file = %path.display(), "{warning}");
    }

    if report.is_ok() {
        info!(file = %path.display(), "Stage plan validation passed");
        Ok(())
    } else {
        for error_msg in &report.errors {
            error!(file = %path.display(), "{error_msg}");
        }
        Err(anyhow!(
            "Stage plan validation failed with {} error(s)",
            report.errors.len()
        ))
    }
}

fn list_targets(path: Option<PathBuf>) -> Result<()> {
    let plan = load_plan(path.as_ref())?;
    for target in &plan.targets {
        println!("{target}");
    }
    Ok(())
}

fn init_plan(output: PathBuf) -> Result<()> {
    if output.exists() {
        bail!("Refusing to overwrite existing file: {}", output.display());
    }
    let written = write_plan(&StagePlan::default(), &output)?;
    info!(path = %written.display(), "Stage plan written");
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "hedera-stage",
    version,
    about = "Cross-compile libhedera and stage the static archive for the Go SDK"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and stage every target (the default when no subcommand is given)
    Run(RunArgs),
    Validate {
        plan: PathBuf,
    },
    /// Print the targets of a plan in staging order
    Targets {
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    PlanInit {
        #[arg(long, default_value = "stage.yaml")]
        output: PathBuf,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    #[arg(long)]
    plan: Option<PathBuf>,
    #[arg(long = "target", value_name = "TRIPLE")]
    targets: Vec<String>,
    #[arg(long)]
    add_targets: bool,
    #[arg(long)]
    dry_run: bool,
    #[arg(long)]
    print_metrics: bool,
    #[arg(long = "metrics-json")]
    metrics_json: Option<PathBuf>,
    #[arg(long)]
    manifest: Option<PathBuf>,
}
