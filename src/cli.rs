//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// telemetry-api - per-region latency and uptime metrics
///
/// Loads a telemetry JSON file once and serves aggregate metrics
/// (mean latency, p95 latency, mean uptime, threshold breaches) per region.
///
/// Examples:
///   telemetry-api --data telemetry.json
///   telemetry-api --port 9000 --config ./service.toml
///   telemetry-api --regions us-east,eu-west --threshold-ms 180
///   telemetry-api --regions us-east --threshold-ms 180 --format markdown -o report.md
///   telemetry-api --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .telemetry-api.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Telemetry JSON file to load at startup
    #[arg(short, long, value_name = "FILE", env = "TELEMETRY_DATA")]
    pub data: Option<PathBuf>,

    /// Interface to bind the HTTP server to
    #[arg(long, value_name = "HOST", env = "TELEMETRY_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", env = "TELEMETRY_PORT")]
    pub port: Option<u16>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Compute metrics for these regions once and exit (comma-separated)
    ///
    /// Example: --regions us-east,eu-west
    #[arg(long, value_name = "REGIONS", value_delimiter = ',', requires = "threshold_ms")]
    pub regions: Option<Vec<String>>,

    /// Latency threshold for breach counting in query mode
    #[arg(
        long,
        value_name = "MS",
        allow_negative_numbers = true,
        requires = "regions"
    )]
    pub threshold_ms: Option<i64>,

    /// Output format for query mode (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write query output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Generate a default .telemetry-api.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for query mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether to run a single query instead of serving.
    pub fn is_query(&self) -> bool {
        self.regions.is_some()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if let Some(ref regions) = self.regions {
            if regions.iter().all(|r| r.trim().is_empty()) {
                return Err("--regions needs at least one region".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if data.is_dir() {
                return Err(format!(
                    "Data path is a directory, expected a JSON file: {}",
                    data.display()
                ));
            }
        }

        Ok(())
    }
}
