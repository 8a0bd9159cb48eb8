//! Telemetry file loader.
//!
//! Two JSON layouts are accepted: a list of row objects, or an object of
//! columns where each column maps a row index to a value.

use crate::models::{Dataset, TelemetryRecord, TelemetryTable};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while reading the telemetry file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not a recognised telemetry layout.
    #[error("invalid telemetry JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The three columns do not share the same row indices.
    #[error("column `{column}` has no value for row {index}")]
    ColumnMismatch { column: &'static str, index: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTelemetry {
    Records(Vec<TelemetryRecord>),
    Columns(ColumnLayout),
}

#[derive(Debug, Deserialize)]
struct ColumnLayout {
    region: BTreeMap<String, String>,
    latency_ms: BTreeMap<String, f64>,
    uptime_pct: BTreeMap<String, f64>,
}

impl ColumnLayout {
    /// Assemble rows ordered by numeric index (non-numeric indices last).
    fn into_records(self) -> Result<Vec<TelemetryRecord>, LoadError> {
        let extra = self
            .latency_ms
            .keys()
            .chain(self.uptime_pct.keys())
            .find(|index| !self.region.contains_key(*index));
        if let Some(index) = extra {
            return Err(LoadError::ColumnMismatch {
                column: "region",
                index: index.clone(),
            });
        }

        let mut indices: Vec<&String> = self.region.keys().collect();
        indices.sort_by_key(|index| (index.parse::<u64>().map_err(|_| ()), (*index).clone()));

        indices
            .into_iter()
            .map(|index| {
                let latency_ms = *self.latency_ms.get(index).ok_or_else(|| {
                    LoadError::ColumnMismatch {
                        column: "latency_ms",
                        index: index.clone(),
                    }
                })?;
                let uptime_pct = *self.uptime_pct.get(index).ok_or_else(|| {
                    LoadError::ColumnMismatch {
                        column: "uptime_pct",
                        index: index.clone(),
                    }
                })?;

                Ok(TelemetryRecord::new(
                    self.region[index].clone(),
                    latency_ms,
                    uptime_pct,
                ))
            })
            .collect()
    }
}

/// Parse telemetry JSON into a table.
pub fn parse_table(content: &str) -> Result<TelemetryTable, LoadError> {
    let records = match serde_json::from_str::<RawTelemetry>(content)? {
        RawTelemetry::Records(records) => records,
        RawTelemetry::Columns(columns) => columns.into_records()?,
    };

    Ok(TelemetryTable::new(records))
}

/// Read and parse the telemetry file at `path`.
pub fn load_table(path: &Path) -> Result<TelemetryTable, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_table(&content)
}

/// Load the dataset for the lifetime of the process.
///
/// Never fails: any error is logged and yields [`Dataset::Unavailable`].
pub fn load_dataset(path: &Path) -> Dataset {
    match load_table(path) {
        Ok(table) => {
            info!(
                "Loaded {} telemetry records across {} regions from {}",
                table.len(),
                table.regions().len(),
                path.display()
            );
            Dataset::loaded(table)
        }
        Err(e) => {
            warn!("Telemetry data unavailable: {}", e);
            Dataset::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_records_layout() {
        let json = r#"[
            {"region": "us-east", "service": "api", "latency_ms": 100, "uptime_pct": 99.9, "timestamp": 1},
            {"region": "eu-west", "service": "api", "latency_ms": 50.5, "uptime_pct": 100.0, "timestamp": 2}
        ]"#;

        let table = parse_table(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0], TelemetryRecord::new("us-east", 100.0, 99.9));
        assert_eq!(table.records()[1].latency_ms, 50.5);
    }

    #[test]
    fn test_parse_columns_layout() {
        let json = r#"{
            "region": {"0": "us-east", "1": "eu-west", "10": "us-east", "2": "eu-west"},
            "latency_ms": {"0": 100, "1": 50, "10": 400, "2": 60},
            "uptime_pct": {"0": 99.9, "1": 100.0, "10": 98.5, "2": 100.0}
        }"#;

        let table = parse_table(json).unwrap();
        let latencies: Vec<f64> = table.records().iter().map(|r| r.latency_ms).collect();
        assert_eq!(latencies, vec![100.0, 50.0, 60.0, 400.0]);
        assert_eq!(table.regions(), vec!["us-east", "eu-west"]);
    }

    #[test]
    fn test_parse_columns_missing_value() {
        let json = r#"{
            "region": {"0": "us-east", "1": "eu-west"},
            "latency_ms": {"0": 100},
            "uptime_pct": {"0": 99.9, "1": 100.0}
        }"#;

        match parse_table(json) {
            Err(LoadError::ColumnMismatch { column, index }) => {
                assert_eq!(column, "latency_ms");
                assert_eq!(index, "1");
            }
            other => panic!("expected column mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_columns_extra_index() {
        let json = r#"{
            "region": {"0": "us-east"},
            "latency_ms": {"0": 100, "1": 9999},
            "uptime_pct": {"0": 99.9, "1": 1.0, "2": 5.0}
        }"#;

        match parse_table(json) {
            Err(LoadError::ColumnMismatch { column, index }) => {
                assert_eq!(column, "region");
                assert_eq!(index, "1");
            }
            other => panic!("expected column mismatch, got {other:?}"),
        }

        let json = r#"{
            "region": {"0": "us-east"},
            "latency_ms": {"0": 100},
            "uptime_pct": {"0": 99.9, "7": 5.0}
        }"#;
        assert!(matches!(
            parse_table(json),
            Err(LoadError::ColumnMismatch { column: "region", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(matches!(parse_table("not json"), Err(LoadError::Parse(_))));
        assert!(matches!(
            parse_table(r#"[{"region": "us-east", "latency_ms": "fast", "uptime_pct": 1}]"#),
            Err(LoadError::Parse(_))
        ));
        assert!(matches!(
            parse_table(r#"{"rows": []}"#),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_empty_records() {
        let table = parse_table("[]").unwrap();
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_load_dataset_from_file() {
        let file = write_temp(
            r#"[{"region": "us-east", "latency_ms": 100, "uptime_pct": 99.9}]"#,
        );

        let dataset = load_dataset(file.path());
        assert!(dataset.is_loaded());
        assert_eq!(dataset.table().map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_load_dataset_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.json");

        assert!(matches!(load_table(&path), Err(LoadError::Io { .. })));
        assert!(matches!(load_dataset(&path), Dataset::Unavailable));
    }

    #[test]
    fn test_load_dataset_garbage_is_unavailable() {
        let file = write_temp("{{{");
        assert!(matches!(load_dataset(file.path()), Dataset::Unavailable));
    }

    #[test]
    fn test_bundled_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/telemetry.json");
        let table = load_table(&path).unwrap();
        assert!(!table.is_empty());
        assert!(table.regions().contains(&"us-east"));
    }
}
