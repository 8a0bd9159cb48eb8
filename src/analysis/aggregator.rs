//! Per-region telemetry aggregation.
//!
//! This module computes mean latency, p95 latency, mean uptime and the
//! number of threshold breaches for each requested region. Everything
//! here is pure: the table is only read and nothing is logged.

use crate::models::{Dataset, RegionMetrics, RegionMetricsMap, TelemetryRecord};
use thiserror::Error;

/// Percentile reported as `p95_latency`.
pub const P95: f64 = 0.95;

/// Message returned to clients when no telemetry is loaded.
pub const DATA_UNAVAILABLE_MESSAGE: &str = "Telemetry data not loaded.";

/// Reasons an aggregation cannot produce a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The telemetry table failed to load at startup.
    #[error("Telemetry data not loaded.")]
    DataUnavailable,
}

/// Compute metrics for every region in `regions`.
///
/// Regions without rows are left out. A region listed twice is computed
/// twice and keeps its first position in the output.
pub fn compute(
    dataset: &Dataset,
    regions: &[String],
    threshold_ms: i64,
) -> Result<RegionMetricsMap, AggregateError> {
    let table = dataset.table().ok_or(AggregateError::DataUnavailable)?;

    let mut results = RegionMetricsMap::new();

    for region in regions {
        let rows: Vec<&TelemetryRecord> = table.rows_for(region).collect();

        if let Some(metrics) = summarize(&rows, threshold_ms) {
            results.insert(region.clone(), metrics);
        }
    }

    Ok(results)
}

/// Summarize one region's rows. Returns `None` for an empty slice.
pub fn summarize(rows: &[&TelemetryRecord], threshold_ms: i64) -> Option<RegionMetrics> {
    if rows.is_empty() {
        return None;
    }

    let latencies: Vec<f64> = rows.iter().map(|r| r.latency_ms).collect();

    Some(RegionMetrics {
        avg_latency: mean(latencies.iter().copied())?,
        p95_latency: percentile(&latencies, P95)?,
        avg_uptime: mean(rows.iter().map(|r| r.uptime_pct))?,
        breaches: count_breaches(&latencies, threshold_ms),
    })
}

/// Arithmetic mean, or `None` when the iterator is empty.
pub fn mean<I: Iterator<Item = f64>>(iter: I) -> Option<f64> {
    let (sum, count) = iter.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Quantile `q` (0.0..=1.0) with linear interpolation between closest ranks.
///
/// The rank is `q * (n - 1)` over the ascending values.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Number of latencies strictly greater than `threshold_ms`.
pub fn count_breaches(latencies: &[f64], threshold_ms: i64) -> usize {
    let threshold = threshold_ms as f64;
    latencies.iter().filter(|&&latency| latency > threshold).count()
}
