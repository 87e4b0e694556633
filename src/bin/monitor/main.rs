//! Congestion Monitor
//!
//! Reads traffic sensor readings (`<time> <light_id> <cars>` per line) from a
//! file or stdin and reports the most congested lights for every window.
//!
//! # CLI Commands
//!
//! - `run` - Process the input and print window reports (default)
//! - `check-config` - Validate configuration and print the effective settings
//!
//! `--sequential` runs the same analysis on a single thread as a baseline
//! for the threaded pipeline's execution time.
//!
//! # Configuration
//!
//! Settings are resolved in this order, later sources winning:
//! 1. Built-in defaults
//! 2. Config file (`--config`, `CONGESTION_CONFIG`, or `./congestion.toml`)
//! 3. `CONGESTION_*` environment variables
//! 4. Command-line flags
//!
//! Logs go to stderr so reports on stdout stay machine-readable.

mod config;

use config::LoadedConfig;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use kuba_congestion::{
    config::ApplicationConfig,
    ingestion::{
        protocol::{WhitespaceParser, WhitespaceParserConfig},
        LineSource, RecordSource,
    },
    sink::{ConsoleSink, OutputFormat},
    Pipeline,
};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "congestion-monitor")]
#[command(version)]
#[command(about = "Windowed top-N congestion monitor for traffic light sensors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (overrides CONGESTION_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Input file, or "-" for stdin
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Report format (text, json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Window length in milliseconds
    #[arg(long, global = true)]
    window_ms: Option<i64>,

    /// Lights reported per window
    #[arg(short = 'n', long, global = true)]
    top_n: Option<usize>,

    /// Records buffered between reader and analyzer
    #[arg(long, global = true)]
    capacity: Option<usize>,

    /// Read and analyze on one thread, without the queue
    #[arg(long, global = true)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process the input and print window reports (default)
    Run,

    /// Validate configuration without processing any input
    CheckConfig,
}

// =============================================================================
// Configuration
// =============================================================================

/// Apply command-line flags over file and environment settings
fn apply_cli_overrides(cli: &Cli, app_config: &mut ApplicationConfig) -> Result<(), String> {
    if let Some(input) = &cli.input {
        app_config.input.path = Some(input.clone());
    }
    if let Some(format) = &cli.format {
        app_config.output.format = format.parse::<OutputFormat>()?;
    }
    if let Some(window_ms) = cli.window_ms {
        app_config.pipeline.window_duration_ms = window_ms;
    }
    if let Some(top_n) = cli.top_n {
        app_config.pipeline.top_n = top_n;
    }
    if let Some(capacity) = cli.capacity {
        app_config.pipeline.queue_capacity = capacity;
    }
    Ok(())
}

/// Load config, apply command-line overrides, then validate once
fn resolve_config(cli: &Cli) -> Result<LoadedConfig, Box<dyn std::error::Error>> {
    let mut loaded = config::load_config(cli.config.as_deref())?;
    apply_cli_overrides(cli, &mut loaded.config)?;
    loaded.config.validate()?;
    Ok(loaded)
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Stdin when no path is set or the path is "-"
fn open_source(path: Option<&Path>) -> Result<Box<dyn RecordSource + Send>, kuba_congestion::Error> {
    match path {
        Some(p) if p != Path::new("-") => Ok(Box::new(LineSource::open(p)?)),
        _ => Ok(Box::new(LineSource::stdin())),
    }
}

// =============================================================================
// CLI Command Handlers
// =============================================================================

/// Validate configuration and print summary
fn cmd_check_config(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let LoadedConfig {
        config: app_config,
        path,
        env_issues,
    } = resolve_config(cli)?;

    println!("Configuration is valid!");
    println!();
    for issue in &env_issues {
        println!("Warning: ignored environment override: {}", issue);
    }
    match path {
        Some(p) => println!("Config file: {}", p.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!();
    println!("Pipeline Settings:");
    println!("  Queue capacity: {}", app_config.pipeline.queue_capacity);
    println!("  Window length: {} ms", app_config.pipeline.window_duration_ms);
    println!("  Top N: {}", app_config.pipeline.top_n);
    println!();
    println!("Input:");
    match &app_config.input.path {
        Some(p) => println!("  Path: {}", p.display()),
        None => println!("  Path: (stdin)"),
    }
    println!("  Max line length: {} bytes", app_config.input.max_line_length);
    println!("  Reject trailing fields: {}", app_config.input.reject_trailing);
    println!();
    println!("Output format: {}", app_config.output.format);
    println!("Log level: {}", app_config.logging.level);

    Ok(())
}

/// Run the pipeline over the configured input
fn cmd_run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let LoadedConfig {
        config: app_config,
        path,
        env_issues,
    } = resolve_config(cli)?;
    init_tracing(&app_config.logging.level);

    info!("Starting congestion monitor v{}", env!("CARGO_PKG_VERSION"));
    for issue in &env_issues {
        warn!(%issue, "Ignoring environment override");
    }
    debug!(config_file = ?path, input = ?app_config.input.path, "Configuration loaded");

    let source = open_source(app_config.input.path.as_deref())?;
    let parser = WhitespaceParser::with_config(WhitespaceParserConfig {
        max_line_length: app_config.input.max_line_length,
        reject_trailing: app_config.input.reject_trailing,
    });
    let format = app_config.output.format;

    let pipeline = Pipeline::new(app_config.pipeline)?;
    let sink = ConsoleSink::stdout(format);
    let report = if cli.sequential {
        pipeline.run_sequential(source, parser, sink)?
    } else {
        pipeline.run(source, parser, sink)?
    };

    let micros = report.elapsed.as_micros();
    match format {
        OutputFormat::Text => println!("Execution time: {} microseconds", micros),
        OutputFormat::Json => info!(
            report = %serde_json::to_string(&report)?,
            "Execution time: {} microseconds",
            micros
        ),
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::CheckConfig) => cmd_check_config(&cli),
        Some(Commands::Run) | None => cmd_run(&cli),
    }
}
