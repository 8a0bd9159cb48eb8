//! Markdown and JSON rendering of query results.

use crate::models::{QueryMetadata, QueryReport, RegionMetricsMap};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &QueryReport) -> String {
    let mut output = String::new();

    output.push_str("# Telemetry Metrics Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_metrics_section(&report.results));
    output.push_str(&generate_missing_section(&report.missing_regions));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &QueryMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data File:** `{}`\n", metadata.data_path));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records Loaded:** {}\n",
        metadata.records_loaded
    ));
    section.push_str(&format!(
        "- **Breach Threshold:** {} ms\n",
        metadata.threshold_ms
    ));
    section.push_str(&format!(
        "- **Regions Matched:** {} of {} requested\n",
        metadata.regions_matched, metadata.regions_requested
    ));
    section.push('\n');

    section
}

/// Generate the per-region metrics table.
fn generate_metrics_section(results: &RegionMetricsMap) -> String {
    let mut section = String::new();

    section.push_str("## Metrics by Region\n\n");

    if results.is_empty() {
        section.push_str("No telemetry matched the requested regions.\n\n");
        return section;
    }

    section.push_str("| Region | Avg Latency (ms) | P95 Latency (ms) | Avg Uptime (%) | Breaches |\n");
    section.push_str("|:---|---:|---:|---:|---:|\n");

    for (region, metrics) in results.iter() {
        section.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.3} | {} |\n",
            region, metrics.avg_latency, metrics.p95_latency, metrics.avg_uptime, metrics.breaches
        ));
    }
    section.push('\n');

    section
}

/// List requested regions that had no telemetry.
fn generate_missing_section(missing: &[String]) -> String {
    if missing.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Regions Without Data\n\n");
    for region in missing {
        section.push_str(&format!("- `{}`\n", region));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by telemetry-api v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate the JSON body, identical to the `POST /api` response.
pub fn generate_json_report(results: &RegionMetricsMap) -> Result<String> {
    serde_json::to_string_pretty(results).map_err(Into::into)
}

/// Write rendered output to `path`, or stdout when no path is given.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}
