//! Data models for the telemetry service.
//!
//! This module contains the core data structures used throughout
//! the application for representing telemetry rows, the loaded table,
//! incoming metric requests and per-region results.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

/// A single telemetry observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Region identifier (exact, case-sensitive).
    pub region: String,
    /// Observed latency in milliseconds.
    pub latency_ms: f64,
    /// Observed uptime percentage.
    pub uptime_pct: f64,
}

impl TelemetryRecord {
    pub fn new(region: impl Into<String>, latency_ms: f64, uptime_pct: f64) -> Self {
        Self {
            region: region.into(),
            latency_ms,
            uptime_pct,
        }
    }
}

/// Ordered, read-only collection of telemetry records.
#[derive(Debug, Clone, Default)]
pub struct TelemetryTable {
    records: Vec<TelemetryRecord>,
    loaded_at: Option<DateTime<Utc>>,
}

impl TelemetryTable {
    /// Creates a table from records, stamping the load time.
    pub fn new(records: Vec<TelemetryRecord>) -> Self {
        Self {
            records,
            loaded_at: Some(Utc::now()),
        }
    }

    /// All records in load order.
    #[cfg(test)]
    pub fn records(&self) -> &[TelemetryRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the table was built.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Records belonging to exactly `region`.
    pub fn rows_for<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a TelemetryRecord> {
        self.records.iter().filter(move |r| r.region == region)
    }

    /// Distinct region identifiers in first-seen order.
    pub fn regions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.region.as_str())
            .filter(|region| seen.insert(*region))
            .collect()
    }
}

/// Telemetry as handed to the aggregator by the startup loader.
#[derive(Debug, Clone)]
pub enum Dataset {
    /// The table loaded successfully.
    Loaded(Arc<TelemetryTable>),
    /// Loading failed; every query must report that data is not available.
    Unavailable,
}

impl Dataset {
    /// Wraps a table as a loaded dataset.
    pub fn loaded(table: TelemetryTable) -> Self {
        Dataset::Loaded(Arc::new(table))
    }

    /// Returns the table if it was loaded.
    pub fn table(&self) -> Option<&TelemetryTable> {
        match self {
            Dataset::Loaded(table) => Some(table),
            Dataset::Unavailable => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Dataset::Loaded(_))
    }
}

/// Body of a metrics query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRequest {
    /// Regions to report on, in caller order. Duplicates are allowed.
    pub regions: Vec<String>,
    /// Latencies strictly above this value count as breaches.
    pub threshold_ms: i64,
}

/// Aggregate metrics for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Mean latency in milliseconds.
    pub avg_latency: f64,
    /// 95th-percentile latency, linearly interpolated.
    pub p95_latency: f64,
    /// Mean uptime percentage.
    pub avg_uptime: f64,
    /// Rows with latency above the threshold.
    pub breaches: usize,
}

/// Region → metrics, keeping keys in the order they were first inserted.
///
/// Serializes as a plain JSON object. Inserting an existing key replaces
/// its value without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionMetricsMap {
    entries: Vec<(String, RegionMetrics)>,
}

impl RegionMetricsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the metrics for `region`.
    pub fn insert(&mut self, region: String, metrics: RegionMetrics) {
        match self.entries.iter_mut().find(|(key, _)| *key == region) {
            Some((_, existing)) => *existing = metrics,
            None => self.entries.push((region, metrics)),
        }
    }

    pub fn get(&self, region: &str) -> Option<&RegionMetrics> {
        self.entries
            .iter()
            .find(|(key, _)| key == region)
            .map(|(_, metrics)| metrics)
    }

    pub fn contains_region(&self, region: &str) -> bool {
        self.get(region).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegionMetrics)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for RegionMetricsMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (region, metrics) in &self.entries {
            map.serialize_entry(region, metrics)?;
        }
        map.end()
    }
}

/// Error body returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health endpoint payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// `ok` when data is loaded, `degraded` otherwise.
    pub status: String,
    pub records: usize,
    pub regions: usize,
    pub loaded_at: Option<DateTime<Utc>>,
    pub version: String,
}

impl HealthStatus {
    /// Describes the current dataset.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let (status, records, regions, loaded_at) = match dataset.table() {
            Some(table) => ("ok", table.len(), table.regions().len(), table.loaded_at()),
            None => ("degraded", 0, 0, None),
        };

        Self {
            status: status.to_string(),
            records,
            regions,
            loaded_at,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Metadata for a one-shot query report.
#[derive(Debug, Clone)]
pub struct QueryMetadata {
    /// Telemetry file the table was loaded from.
    pub data_path: String,
    pub generated_at: DateTime<Utc>,
    pub threshold_ms: i64,
    pub records_loaded: usize,
    pub regions_requested: usize,
    pub regions_matched: usize,
}

/// Result of a one-shot query, ready for rendering.
#[derive(Debug, Clone)]
pub struct QueryReport {
    pub metadata: QueryMetadata,
    pub results: RegionMetricsMap,
    /// Requested regions with no rows, in request order, without repeats.
    pub missing_regions: Vec<String>,
}

impl QueryReport {
    /// Assemble a report from a computed mapping.
    pub fn new(
        data_path: String,
        records_loaded: usize,
        request: &MetricsRequest,
        results: RegionMetricsMap,
    ) -> Self {
        let mut seen = HashSet::new();
        let missing_regions = request
            .regions
            .iter()
            .filter(|region| !results.contains_region(region))
            .filter(|region| seen.insert(region.as_str()))
            .cloned()
            .collect();

        let metadata = QueryMetadata {
            data_path,
            generated_at: Utc::now(),
            threshold_ms: request.threshold_ms,
            records_loaded,
            regions_requested: request.regions.len(),
            regions_matched: results.len(),
        };

        Self {
            metadata,
            results,
            missing_regions,
        }
    }
}
