//! snaptrack - GPS trajectory cleanup and map matching
//!
//! # Usage
//!
//! ```bash
//! # Match every GPX file under ./tracks against a local GraphHopper
//! snaptrack run ./tracks --output-dir ./matched
//!
//! # Convert a text position log to GPX
//! snaptrack convert-pos ride.pos ride.gpx
//!
//! # Merge several recordings into one track ordered by time
//! snaptrack merge combined.gpx phone.gpx logger.pos
//! ```
//!
//! # Environment Variables
//!
//! - `SNAPTRACK_CONFIG`: Path to a TOML config file (default: ./snaptrack.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use snaptrack::acquisition::{read_pos, read_track, write_gpx};
use snaptrack::config::PipelineConfig;
use snaptrack::matching::GraphHopperBackend;
use snaptrack::pipeline::{JobOutcome, PipelineCoordinator, RunReport};
use snaptrack::Trajectory;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Some files failed or were skipped.
const EXIT_PARTIAL: u8 = 2;
/// Setup failed before any file was processed.
const EXIT_FATAL: u8 = 1;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "snaptrack")]
#[command(about = "Clean GPS tracks and snap them to the road network")]
#[command(version)]
struct CliArgs {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Config file (overrides SNAPTRACK_CONFIG and ./snaptrack.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Preprocess and map-match every track file under a directory
    Run(RunArgs),

    /// Convert a `.pos` position log to GPX
    ConvertPos {
        /// Input `.pos` file
        input: PathBuf,
        /// Output GPX file
        output: PathBuf,
    },

    /// Merge GPX and `.pos` recordings into one GPX track sorted by time
    Merge {
        /// Output GPX file
        output: PathBuf,
        /// Input files; `.pos` files are read as position logs, anything else as GPX
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Directory containing track files
    input_dir: PathBuf,

    /// Write matched tracks here, mirroring the input tree
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Worker count and in-flight request limit
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Vehicle profile passed to the backend (car, bike, foot, ...)
    #[arg(long)]
    vehicle: Option<String>,

    /// Map-matching endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Outlier distance threshold (km)
    #[arg(long)]
    max_distance_km: Option<f64>,

    /// Outlier speed threshold (km/h)
    #[arg(long)]
    max_speed_kmh: Option<f64>,

    /// Longest time gap kept between fixes (seconds)
    #[arg(long)]
    max_gap_secs: Option<f64>,

    /// Longest distance gap kept between fixes (meters)
    #[arg(long)]
    max_gap_meters: Option<f64>,

    /// Backend attempts per track, first attempt included
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Track file extension to pick up
    #[arg(long)]
    extension: Option<String>,

    /// Only scan the top level of the input directory
    #[arg(long)]
    no_recursive: bool,

    /// Write the run report as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Runtime used to schedule jobs
    #[arg(long, value_enum, default_value_t = Scheduler::Threaded)]
    scheduler: Scheduler,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Scheduler {
    /// Single-threaded cooperative runtime
    Cooperative,
    /// Multi-threaded work-stealing runtime
    Threaded,
}

// ============================================================================
// Entry point
// ============================================================================

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.log_format);

    match dispatch(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn dispatch(args: CliArgs) -> Result<ExitCode> {
    match args.command {
        SubCommand::Run(run) => {
            let config = load_config(args.config.as_deref(), &run)?;
            let runtime = match run.scheduler {
                Scheduler::Cooperative => tokio::runtime::Builder::new_current_thread(),
                Scheduler::Threaded => tokio::runtime::Builder::new_multi_thread(),
            }
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
            runtime.block_on(run_command(config, run))
        }
        SubCommand::ConvertPos { input, output } => {
            let trajectory =
                read_pos(&input).with_context(|| format!("reading {}", input.display()))?;
            write_gpx(&trajectory, &output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(input = %input.display(), output = %output.display(), fixes = trajectory.len(), "Converted position log");
            Ok(ExitCode::SUCCESS)
        }
        SubCommand::Merge { output, inputs } => {
            let parts = inputs
                .iter()
                .map(|p| read_track(p).with_context(|| format!("reading {}", p.display())))
                .collect::<Result<Vec<_>>>()?;
            let merged = Trajectory::merge(parts).context("merging tracks")?;
            write_gpx(&merged, &output).with_context(|| format!("writing {}", output.display()))?;
            info!(inputs = inputs.len(), output = %output.display(), fixes = merged.len(), "Merged tracks");
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// File config (explicit path, env var, ./snaptrack.toml or defaults) with
/// CLI flags applied on top.
fn load_config(explicit: Option<&Path>, run: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match explicit {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::load(),
    };

    if let Some(v) = run.concurrency {
        config.pipeline.concurrency = v;
    }
    if let Some(v) = &run.output_dir {
        config.pipeline.output_dir = Some(v.clone());
    }
    if let Some(v) = &run.extension {
        config.pipeline.extension = v.trim_start_matches('.').to_string();
    }
    if run.no_recursive {
        config.pipeline.recursive = false;
    }
    if let Some(v) = &run.vehicle {
        config.matcher.vehicle = v.clone();
    }
    if let Some(v) = &run.endpoint {
        config.matcher.endpoint = v.clone();
    }
    if let Some(v) = run.max_attempts {
        config.matcher.max_attempts = v;
    }
    if let Some(v) = run.max_distance_km {
        config.filter.max_distance_km = Some(v);
    }
    if let Some(v) = run.max_speed_kmh {
        config.filter.max_speed_kmh = Some(v);
    }
    if let Some(v) = run.max_gap_secs {
        config.interpolation.max_gap_secs = v;
    }
    if let Some(v) = run.max_gap_meters {
        config.interpolation.max_gap_meters = Some(v);
    }

    config.validate()?;
    Ok(config)
}

// ============================================================================
// run
// ============================================================================

async fn run_command(config: PipelineConfig, args: RunArgs) -> Result<ExitCode> {
    if !args.input_dir.is_dir() {
        bail!("input directory {} does not exist", args.input_dir.display());
    }

    let options = config.pipeline_options()?;
    let backend = GraphHopperBackend::new(&config.matcher.endpoint, config.matcher.timeout())?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  snaptrack {}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        input = %args.input_dir.display(),
        endpoint = %config.matcher.endpoint,
        vehicle = %options.vehicle,
        concurrency = options.concurrency,
        scheduler = ?args.scheduler,
        "Starting run"
    );

    // Graceful shutdown via Ctrl+C: stop dispatching, let running jobs finish
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, finishing in-flight jobs");
            shutdown.cancel();
        }
    });

    let coordinator = PipelineCoordinator::new(Arc::new(backend), options);
    let report = coordinator.run(&args.input_dir, cancel).await?;

    print_report(&report);

    if let Some(path) = &args.report {
        let json = report.to_json().context("serializing run report")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing report {}", path.display()))?;
        info!(path = %path.display(), "Run report written");
    }

    Ok(if report.all_validated() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_PARTIAL)
    })
}

fn print_report(report: &RunReport) {
    println!("{:<10} {:<13} {:>6} {:>6} {:>4}  FILE", "OUTCOME", "STAGE", "IN", "OUT", "TRY");
    for f in &report.files {
        let outcome = match f.outcome {
            JobOutcome::Validated => "ok",
            JobOutcome::Failed => "FAILED",
            JobOutcome::Skipped => "skipped",
        };
        println!(
            "{:<10} {:<13} {:>6} {:>6} {:>4}  {}",
            outcome,
            f.stage.to_string(),
            f.fixes_in,
            f.fixes_out,
            f.attempts,
            f.path.display()
        );
        if let Some(e) = &f.error {
            println!("{:<10} {e}", "");
        }
    }

    println!();
    println!(
        "{} file(s): {} validated, {} failed, {} not dispatched in {:.1}s",
        report.total(),
        report.validated,
        report.failed,
        report.not_dispatched,
        report.elapsed.as_secs_f64()
    );
    for (kind, count) in &report.failures_by_kind {
        println!("  {kind}: {count}");
    }
}
