//! # inspect-cli
//!
//! Binary entry point for the Retrieval Inspector.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Configuration loading with command-line overrides
//! - Signal handling that stops the instance loop after cleanup
//! - The `extract` diagnostic, which never touches Docker

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use inspect_adapters::{DockerRuntime, EditorLauncher};
use inspect_core::{
    ConfigOverrides, Dataset, InspectorConfig, InstanceOutcome, InstanceRunner,
    NamespacedSpecProvider, RetrievalBlockExtractor, RunSummary, RunnerOptions, check_images,
};
use inspect_proto::{ContainerRuntime, Launcher, TestSpecProvider};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Exit code after a run was stopped by a signal.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Output format for the extract command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing
    #[default]
    Table,
    /// JSON array for programmatic access
    Json,
}

/// Retrieval Inspector - open retrieved files inside per-instance containers
#[derive(Parser, Debug)]
#[command(name = "retrieval-inspector", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (optional if it does not exist)
    #[arg(short, long, default_value = "inspector.yml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk the dataset and open each instance's retrieved files in the editor
    Run(RunArgs),

    /// Print the retrieved paths of each instance without touching Docker
    Extract(ExtractArgs),
}

/// Arguments for the run subcommand.
#[derive(Parser, Debug)]
struct RunArgs {
    /// Dataset file, or directory holding `<split>.jsonl`
    #[arg(long)]
    dataset_path: Option<PathBuf>,

    /// Dataset split
    #[arg(long)]
    split: Option<String>,

    /// Run identifier used in container names
    #[arg(long)]
    run_id: Option<String>,

    /// Editor binary (required unless set in config)
    #[arg(long)]
    editor: Option<String>,

    /// Host directory for editor state and outputs
    #[arg(long)]
    mount_root: Option<PathBuf>,

    /// Editor profile name
    #[arg(long)]
    profile: Option<String>,

    /// Only process these instances (repeatable)
    #[arg(long = "instance-id")]
    instance_ids: Vec<String>,

    /// Remove each instance image after its session
    #[arg(long)]
    remove_image: bool,

    /// Dry run - log mounts and editor command lines without creating containers
    #[arg(long)]
    dry_run: bool,

    /// Concurrent image lookups during pre-flight
    #[arg(long)]
    preflight_workers: Option<usize>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            dataset_path: self.dataset_path.clone(),
            split: self.split.clone(),
            run_id: self.run_id.clone(),
            editor: self.editor.clone(),
            profile: self.profile.clone(),
            mount_root: self.mount_root.clone(),
            instance_ids: self.instance_ids.clone(),
            remove_image: self.remove_image,
            preflight_workers: self.preflight_workers,
        }
    }
}

/// Arguments for the extract subcommand.
#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Dataset file, or directory holding `<split>.jsonl`
    #[arg(long)]
    dataset_path: Option<PathBuf>,

    /// Dataset split
    #[arg(long)]
    split: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    match cli.command {
        Commands::Run(args) => run_command(cli.config, args).await,
        Commands::Extract(args) => extract_command(cli.config, args),
    }
}

async fn run_command(config_path: PathBuf, args: RunArgs) -> Result<()> {
    let mut config = InspectorConfig::from_file_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;

    let dataset = load_dataset(&config)?;
    info!(
        instances = dataset.len(),
        split = %config.dataset.split,
        run_id = %config.run_id,
        "Dataset loaded"
    );

    let specs: Arc<dyn TestSpecProvider> =
        Arc::new(NamespacedSpecProvider::from_config(&config.session));
    let launcher: Arc<dyn Launcher> = Arc::new(EditorLauncher::new(
        config.editor.binary.clone(),
        config.editor.profile.clone(),
    ));
    let options = RunnerOptions::from_config(&config).with_dry_run(args.dry_run);

    let runner = if args.dry_run {
        info!("Dry run, Docker will not be contacted");
        InstanceRunner::planning(specs, launcher, options)
    } else {
        let docker = DockerRuntime::connect(config.session.stop_timeout_secs)
            .context("Failed to connect to Docker")?;
        docker
            .ping()
            .await
            .context("Docker daemon is not reachable")?;
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);

        if config.preflight.enabled {
            let report = check_images(
                runtime.as_ref(),
                specs.as_ref(),
                dataset.instances(),
                config.preflight.max_workers,
            )
            .await;
            if !report.all_present() {
                warn!(
                    missing = report.missing.len(),
                    "Some instance images are missing; build them with the evaluation harness"
                );
            }
        }

        InstanceRunner::new(runtime, specs, launcher, options)
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_listener(shutdown_tx);

    let summary = runner.with_shutdown(shutdown_rx).run(&dataset).await;
    print_summary(&summary);

    if summary.was_interrupted() {
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
    Ok(())
}

fn load_dataset(config: &InspectorConfig) -> Result<Dataset> {
    let dataset = Dataset::load(&config.dataset.path, &config.dataset.split).with_context(|| {
        format!(
            "Failed to load dataset {} (split {})",
            config.dataset.path.display(),
            config.dataset.split
        )
    })?;
    Ok(dataset.filter_ids(&config.dataset.instance_ids))
}

/// One instance in `extract --format json` output.
#[derive(Debug, Serialize)]
struct ExtractRecord<'a> {
    instance_id: &'a str,
    paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    miss: Option<String>,
}

fn extract_command(config_path: PathBuf, args: ExtractArgs) -> Result<()> {
    let mut config = InspectorConfig::from_file_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_overrides(ConfigOverrides {
        dataset_path: args.dataset_path,
        split: args.split,
        ..ConfigOverrides::default()
    });

    let dataset = load_dataset(&config)?;
    let extractor = RetrievalBlockExtractor::new();

    let records: Vec<ExtractRecord<'_>> = dataset
        .iter()
        .map(|instance| match extractor.extract(&instance.text) {
            Ok(paths) => ExtractRecord {
                instance_id: &instance.instance_id,
                paths: paths.into_inner(),
                miss: None,
            },
            Err(miss) => {
                debug!(instance_id = %instance.instance_id, reason = %miss, "Nothing to extract");
                ExtractRecord {
                    instance_id: &instance.instance_id,
                    paths: Vec::new(),
                    miss: Some(miss.to_string()),
                }
            }
        })
        .collect();

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Table => {
            for record in &records {
                match &record.miss {
                    Some(miss) => println!("{}  skipped: {miss}", record.instance_id),
                    None => {
                        println!("{}  {} paths", record.instance_id, record.paths.len());
                        for path in &record.paths {
                            println!("  {path}");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    for report in &summary.reports {
        let status = match &report.outcome {
            InstanceOutcome::Inspected { exit_code } => match exit_code {
                Some(0) => "inspected".to_string(),
                Some(code) => format!("inspected (editor exit {code})"),
                None => "inspected (editor killed)".to_string(),
            },
            InstanceOutcome::Planned { .. } => "planned".to_string(),
            InstanceOutcome::Skipped(miss) => format!("skipped: {miss}"),
            InstanceOutcome::Failed(reason) => format!("failed: {reason}"),
            InstanceOutcome::Interrupted => "interrupted".to_string(),
        };
        println!("{:<48} {:>3} paths  {status}", report.instance_id, report.paths);
    }
    println!(
        "\n{} inspected, {} planned, {} skipped, {} failed",
        summary.inspected(),
        summary.planned(),
        summary.skipped(),
        summary.failed()
    );
}

/// Flips `shutdown` on the first SIGINT, SIGTERM or SIGHUP.
fn spawn_signal_listener(shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        warn!(signal, "Signal received, cleaning up the current instance before exit");
        // Receiver gone means the run already finished
        let _ = shutdown.send(true);
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sighup) =
        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(term), Ok(hup)) => (term, hup),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Cannot register SIGTERM/SIGHUP handlers, listening for Ctrl+C only");
                return wait_for_ctrl_c().await;
            }
        };

    tokio::select! {
        signal = wait_for_ctrl_c() => signal,
        _ = sigterm.recv() => "SIGTERM",
        _ = sighup.recv() => "SIGHUP",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if tokio::signal::ctrl_c().await.is_err() {
        // No handler could be installed; never fire
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "retrieval-inspector",
            "run",
            "--editor",
            "code",
            "--instance-id",
            "a",
            "--instance-id",
            "b",
            "--remove-image",
            "--dry-run",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert!(args.dry_run);
        let overrides = args.overrides();
        assert_eq!(overrides.editor.as_deref(), Some("code"));
        assert_eq!(overrides.instance_ids, vec!["a", "b"]);
        assert!(overrides.remove_image);
        assert_eq!(cli.config, PathBuf::from("inspector.yml"));
    }

    #[test]
    fn test_extract_format_defaults_to_table() {
        let cli = Cli::try_parse_from(["retrieval-inspector", "extract", "-v"]).unwrap();
        assert!(cli.verbose);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract subcommand");
        };
        assert_eq!(args.format, OutputFormat::Table);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["retrieval-inspector"]).is_err());
    }
}
