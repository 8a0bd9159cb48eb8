//! telemetry-api - per-region telemetry metrics service
//!
//! Loads a telemetry JSON file once at startup and serves
//! `POST /api`, which returns mean latency, p95 latency, mean uptime
//! and threshold breach counts for the requested regions. With
//! `--regions` the same computation runs once and prints a report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, bind failure, or no data in query mode)

mod analysis;
mod cli;
mod config;
mod data;
mod models;
mod report;
mod server;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::{Dataset, MetricsRequest, QueryReport};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load config first; it decides the log level
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("telemetry-api v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    if let Err(e) = run(&args, config).await {
        error!("Fatal: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .telemetry-api.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load data, then serve or answer a single query.
async fn run(args: &Args, config: Config) -> Result<()> {
    let dataset = data::load_dataset(&config.data.path);
    if !dataset.is_loaded() {
        warn!(
            "Starting without telemetry from {}; metric requests will fail",
            config.data.path.display()
        );
    }

    if args.is_query() {
        return run_query(args, &config, &dataset);
    }

    server::serve(&config, dataset).await
}

/// Compute metrics once from CLI arguments and print the report.
fn run_query(args: &Args, config: &Config, dataset: &Dataset) -> Result<()> {
    let request = MetricsRequest {
        regions: args.regions.clone().unwrap_or_default(),
        threshold_ms: args.threshold_ms.unwrap_or_default(),
    };

    let results = analysis::compute(dataset, &request.regions, request.threshold_ms)?;

    info!(
        "Matched {} of {} requested regions",
        results.len(),
        request.regions.len()
    );

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&results)?,
        OutputFormat::Markdown => {
            let records_loaded = dataset.table().map_or(0, |table| table.len());
            let query_report = QueryReport::new(
                config.data.path.display().to_string(),
                records_loaded,
                &request,
                results,
            );
            report::generate_markdown_report(&query_report)
        }
    };

    report::write_output(&output, args.output.as_deref())
}

/// Where the active configuration came from.
#[derive(Debug)]
enum ConfigSource {
    File(PathBuf),
    Defaults,
    /// The default file exists but could not be loaded.
    BrokenDefault(anyhow::Error),
}

impl ConfigSource {
    /// Report the source once logging is running.
    fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Defaults => debug!("No config file found, using defaults"),
            ConfigSource::BrokenDefault(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::BrokenDefault(e))),
    }
}
