//! Refactoring Swarm CLI - automated audit, fix and test generation
//!
//! Usage:
//!   swarm run --target-dir <dir>   Audit, fix and test a directory until tests pass
//!   swarm run --target-dir <dir> --dry-run
//!                                  Scan, audit and report only
//!   swarm init [path]              Write a default .swarm/config.toml
//!   swarm log [--tail N]           Show recent interaction-log records
//!   swarm extract <file>           Extract the code block from a saved response

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use swarm_agent::{CodeBlockExtractor, Extraction, HttpTransport, InteractionLog, ModelClient};
use swarm_core::{ActionType, InteractionStatus, PipelineState, SwarmConfig};
use swarm_orchestrator::{Pipeline, ProcessTestRunner, RefactoringSwarm};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "swarm")]
#[command(author, version, about = "Automated code audit, fix and test generation")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the refactoring swarm on a directory
    Run {
        /// Directory containing the source files to refactor
        #[arg(long, alias = "target_dir", value_name = "DIR")]
        target_dir: PathBuf,

        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,

        /// Only scan and audit; no fixes, no generated tests, no test loop
        #[arg(long)]
        dry_run: bool,

        /// Maximum pipeline + test iterations (overrides config)
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// Write a default configuration file
    Init {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show recent interaction-log records
    Log {
        /// Number of records to show
        #[arg(long, default_value = "20")]
        tail: usize,
    },

    /// Extract the fenced code block from a saved model response
    Extract {
        /// File containing the raw response text
        file: PathBuf,

        /// Fence language tag (overrides config)
        #[arg(long)]
        language: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            target_dir,
            model,
            dry_run,
            max_iterations,
        } => cmd_run(load_config()?, target_dir, model, dry_run, max_iterations).await,
        Commands::Init { path } => cmd_init(path),
        Commands::Log { tail } => cmd_log(&load_config()?, tail).await,
        Commands::Extract { file, language } => cmd_extract(&load_config()?, file, language).await,
    }
}

/// Configuration from the working directory, or defaults
fn load_config() -> Result<SwarmConfig> {
    SwarmConfig::load_or_default(Path::new(".")).context("Failed to load .swarm/config.toml")
}

async fn cmd_run(
    mut config: SwarmConfig,
    target_dir: PathBuf,
    model: Option<String>,
    dry_run: bool,
    max_iterations: Option<usize>,
) -> Result<ExitCode> {
    if let Some(model) = model {
        config.model.name = model;
    }
    let max_iterations = max_iterations.unwrap_or(config.loop_defaults.max_iterations);

    if !target_dir.is_dir() {
        println!("Directory not found: {}", target_dir.display());
        return Ok(ExitCode::FAILURE);
    }

    let log = InteractionLog::new(&config.paths.log_file);
    println!("STARTING ON: {}", target_dir.display());
    log.record(
        "System",
        "N/A",
        ActionType::Analysis,
        &format!(
            "Startup initialization for target directory: {}",
            target_dir.display()
        ),
        "System ready - awaiting agent execution",
        InteractionStatus::Success,
    )
    .await;

    match execute(&config, &log, &target_dir, dry_run, max_iterations).await {
        Ok(state) if state.errors.is_empty() => {
            println!("\nMISSION_COMPLETE");
            Ok(ExitCode::SUCCESS)
        }
        Ok(state) => {
            println!("\nFinished with {} error(s)", state.errors.len());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            println!("\nFATAL ERROR: {:#}", e);
            log.record(
                "System",
                "N/A",
                ActionType::Debug,
                "Fatal error during swarm execution",
                &format!("{:#}", e),
                InteractionStatus::Failure,
            )
            .await;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(
    config: &SwarmConfig,
    log: &InteractionLog,
    target_dir: &Path,
    dry_run: bool,
    max_iterations: usize,
) -> Result<PipelineState> {
    let transport =
        HttpTransport::from_config(&config.model).context("Model endpoint is not configured")?;
    info!(
        "Using model {} at {}",
        config.model.name,
        transport.base_url()
    );

    let client = ModelClient::from_config(
        Arc::new(transport),
        log.clone(),
        &config.model,
        &config.retry,
    );
    let pipeline = Pipeline::new(client, config);
    let swarm = RefactoringSwarm::new(
        pipeline,
        ProcessTestRunner::from_config(&config.test_runner),
    );

    let state = if dry_run {
        swarm.dry_run(target_dir).await
    } else {
        swarm.run(target_dir, max_iterations).await
    };
    Ok(state)
}

fn cmd_init(path: PathBuf) -> Result<ExitCode> {
    let config_path = SwarmConfig::config_path(&path);
    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let written = SwarmConfig::write_default(&path)
        .with_context(|| format!("Failed to write config under {}", path.display()))?;
    println!("Wrote default config to {}", written.display());
    println!("Set MISTRAL_API_KEY (or add it to .env) before running `swarm run`.");
    Ok(ExitCode::SUCCESS)
}

async fn cmd_log(config: &SwarmConfig, tail: usize) -> Result<ExitCode> {
    let log = InteractionLog::new(&config.paths.log_file);
    let records = log
        .read_all()
        .await
        .with_context(|| format!("Failed to read {}", log.path().display()))?;

    if records.is_empty() {
        println!("No interactions recorded in {}", log.path().display());
        return Ok(ExitCode::SUCCESS);
    }

    let failures = records
        .iter()
        .filter(|r| r.status == InteractionStatus::Failure)
        .count();
    println!(
        "{} interaction(s), {} failure(s) in {}",
        records.len(),
        failures,
        log.path().display()
    );
    println!("{}", "-".repeat(60));

    let skip = records.len().saturating_sub(tail);
    for record in records.iter().skip(skip) {
        println!("{}", record.summary());
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_extract(
    config: &SwarmConfig,
    file: PathBuf,
    language: Option<String>,
) -> Result<ExitCode> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let language = language.unwrap_or_else(|| config.extraction.fence_language.clone());
    let extractor = CodeBlockExtractor::new(&language);

    match extractor.extract(&text) {
        Extraction::Found { code, span } => {
            debug!("Block body at bytes {}..{}", span.start, span.end);
            println!("{}", code);
            Ok(ExitCode::SUCCESS)
        }
        Extraction::NotFound(reason) => {
            eprintln!(
                "No {} block found in {} ({:?})",
                extractor.opening_marker(),
                file.display(),
                reason
            );
            Ok(ExitCode::FAILURE)
        }
    }
}
