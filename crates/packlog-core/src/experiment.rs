//! Append-only experiment ledger.
//!
//! Two CSV files live in the ledger directory: `experiments.csv` gets one
//! row per invocation and `queries.csv` one row per test record, keyed by
//! the same experiment id. Headers are written only when a file is new.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use packlog_error::{PacklogError, Result};
use serde::Serialize;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::operator::OperatorKind;
use crate::record::{TestRecord, TimeUnit};

pub const EXPERIMENTS_FILE: &str = "experiments.csv";
pub const QUERIES_FILE: &str = "queries.csv";

const EXPERIMENTS_HEADER: [&str; 5] = [
    "experiment_id",
    "experiment_name",
    "timestamp",
    "commit_hash",
    "config",
];
const QUERIES_HEADER: [&str; 5] = [
    "experiment_id",
    "query_id",
    "ordering",
    "is_packed",
    "metrics",
];

const COMMIT_PREFIX_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentMeta {
    pub name: String,
    /// Unix seconds.
    pub timestamp: u64,
    pub commit_hash: String,
}

impl ExperimentMeta {
    /// Stamp `name` with the current wall-clock time.
    pub fn now(name: impl Into<String>, commit_hash: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self {
            name: name.into(),
            timestamp,
            commit_hash: commit_hash.into(),
        }
    }

    /// `<timestamp>_<first 8 chars of the commit>`.
    pub fn experiment_id(&self) -> String {
        let prefix: String = self.commit_hash.chars().take(COMMIT_PREFIX_LEN).collect();
        format!("{}_{prefix}", self.timestamp)
    }
}

/// Per-record metrics blob stored in the `metrics` column.
#[derive(Debug, Serialize)]
struct QueryMetrics<'a> {
    operators: BTreeMap<OperatorKind, u64>,
    instructions: &'a [u64],
    cycles: &'a [u64],
    page_faults: &'a [u64],
    branch_misses: &'a [u64],
    cache_misses: &'a [u64],
    elapsed_time: &'a [f64],
    time_unit: Option<TimeUnit>,
    memory_mb: &'a [f64],
    speedup: f64,
    equivalent_test: &'a str,
}

impl<'a> QueryMetrics<'a> {
    fn from_record(record: &'a TestRecord) -> Self {
        Self {
            operators: record.operator_means().into_iter().collect(),
            instructions: &record.instructions,
            cycles: &record.cycles,
            page_faults: &record.page_faults,
            branch_misses: &record.branch_misses,
            cache_misses: &record.cache_misses,
            elapsed_time: &record.elapsed_time,
            time_unit: record.time_unit,
            memory_mb: &record.peak_memory_mb,
            speedup: record.speedup,
            equivalent_test: &record.equivalent_test,
        }
    }
}

/// Append one experiment and its records to the ledger in `dir`.
///
/// The directory is created if needed. Returns the experiment id.
pub fn append_experiment(
    dir: &Path,
    meta: &ExperimentMeta,
    config: &AnalysisConfig,
    records: &[TestRecord],
) -> Result<String> {
    fs::create_dir_all(dir).map_err(|source| PacklogError::io(dir, source))?;
    let experiment_id = meta.experiment_id();

    let experiments_path = dir.join(EXPERIMENTS_FILE);
    let (file, fresh) = open_append(&experiments_path)?;
    let mut writer = csv_writer(file);
    if fresh {
        writer.write_record(EXPERIMENTS_HEADER)?;
    }
    let config_json = serde_json::to_string(config)?;
    let timestamp = meta.timestamp.to_string();
    writer.write_record([
        experiment_id.as_str(),
        meta.name.as_str(),
        timestamp.as_str(),
        meta.commit_hash.as_str(),
        config_json.as_str(),
    ])?;
    writer
        .flush()
        .map_err(|source| PacklogError::io(&experiments_path, source))?;

    let queries_path = dir.join(QUERIES_FILE);
    let (file, fresh) = open_append(&queries_path)?;
    let mut writer = csv_writer(file);
    if fresh {
        writer.write_record(QUERIES_HEADER)?;
    }
    for record in records {
        let metrics = serde_json::to_string(&QueryMetrics::from_record(record))?;
        let is_packed = record.is_packed().to_string();
        writer.write_record([
            experiment_id.as_str(),
            record.test_label.as_str(),
            record.column_ordering.as_str(),
            is_packed.as_str(),
            metrics.as_str(),
        ])?;
    }
    writer
        .flush()
        .map_err(|source| PacklogError::io(&queries_path, source))?;

    info!(
        experiment = %experiment_id,
        name = %meta.name,
        queries = records.len(),
        dir = %dir.display(),
        "experiment appended to ledger"
    );
    Ok(experiment_id)
}

fn open_append(path: &Path) -> Result<(File, bool)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| PacklogError::io(path, source))?;
    let len = file
        .metadata()
        .map_err(|source| PacklogError::io(path, source))?
        .len();
    Ok((file, len == 0))
}

fn csv_writer(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new().has_headers(false).from_writer(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::SinkTag;
    use crate::record::fixtures::record;

    fn meta() -> ExperimentMeta {
        ExperimentMeta {
            name: "baseline".to_owned(),
            timestamp: 1_700_000_000,
            commit_hash: "0123456789abcdef".to_owned(),
        }
    }

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .expect("open ledger")
            .records()
            .collect::<std::result::Result<_, _>>()
            .expect("ledger rows")
    }

    #[test]
    fn test_experiment_id_uses_commit_prefix() {
        assert_eq!(meta().experiment_id(), "1700000000_01234567");
        let short = ExperimentMeta {
            commit_hash: "unknown".to_owned(),
            ..meta()
        };
        assert_eq!(short.experiment_id(), "1700000000_unknown", "case=short_commit");
    }

    #[test]
    fn test_append_writes_headers_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AnalysisConfig::with_num_runs(2);
        let records = vec![
            record(1, "a->b", "a, b", SinkTag::Plain, false, &[100.0, 120.0]),
            record(2, "a->b", "a, b", SinkTag::Packed, true, &[50.0, 60.0]),
        ];
        append_experiment(dir.path(), &meta(), &config, &records).expect("first append");
        append_experiment(dir.path(), &meta(), &config, &records[..1]).expect("second append");

        let experiments = read_rows(&dir.path().join(EXPERIMENTS_FILE));
        assert_eq!(experiments.len(), 3, "case=one_header_two_rows");
        assert_eq!(&experiments[0][0], "experiment_id");
        assert_eq!(&experiments[1][1], "baseline");
        let config_json: serde_json::Value =
            serde_json::from_str(&experiments[1][4]).expect("config json");
        assert_eq!(config_json["num_runs"], 2);

        let queries = read_rows(&dir.path().join(QUERIES_FILE));
        assert_eq!(queries.len(), 4, "case=one_header_three_rows");
        assert_eq!(&queries[1][1], "test1");
        assert_eq!(&queries[2][3], "true");
        let metrics: serde_json::Value = serde_json::from_str(&queries[1][4]).expect("metrics");
        assert_eq!(metrics["elapsed_time"], serde_json::json!([100.0, 120.0]));
        assert_eq!(metrics["operators"]["SCAN"], 10);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("ledger").join("runs");
        append_experiment(&nested, &meta(), &AnalysisConfig::default(), &[])
            .expect("append into new dir");
        assert_eq!(read_rows(&nested.join(QUERIES_FILE)).len(), 1, "case=header_only");
    }
}
