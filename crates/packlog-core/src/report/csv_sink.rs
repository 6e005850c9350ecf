use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use packlog_error::{PacklogError, Result};
use serde::Serialize;
use tracing::debug;

use super::{bracket_list, sorted_by_variant};
use crate::classify::{SinkClass, classify_sink};
use crate::record::TestRecord;

/// Column names, in `CsvRow` field order.
pub const CSV_HEADER: [&str; 19] = [
    "test_number",
    "test_label",
    "query",
    "column_ordering",
    "is_packed",
    "sink_class",
    "runs",
    "operator_kinds",
    "operator_means",
    "instructions_total",
    "cycles_total",
    "branch_misses_total",
    "cache_misses_total",
    "page_faults_total",
    "median_time",
    "time_unit",
    "median_memory_mb",
    "speedup",
    "equivalent_test",
];

/// One CSV line per test record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub test_number: String,
    pub test_label: String,
    pub query: String,
    pub column_ordering: String,
    pub is_packed: bool,
    pub sink_class: SinkClass,
    pub runs: usize,
    pub operator_kinds: String,
    pub operator_means: String,
    pub instructions_total: u64,
    pub cycles_total: u64,
    pub branch_misses_total: u64,
    pub cache_misses_total: u64,
    pub page_faults_total: u64,
    pub median_time: Option<f64>,
    pub time_unit: Option<String>,
    pub median_memory_mb: Option<f64>,
    pub speedup: f64,
    pub equivalent_test: String,
}

impl CsvRow {
    pub fn from_record(record: &TestRecord) -> Self {
        let means = record.operator_means();
        let totals = record.counter_totals();
        Self {
            test_number: record.test_number.to_string(),
            test_label: record.test_label.clone(),
            query: record.query.clone(),
            column_ordering: record.column_ordering.clone(),
            is_packed: record.is_packed(),
            sink_class: classify_sink(record),
            runs: record.runs,
            operator_kinds: bracket_list(means.iter().map(|(kind, _)| kind)),
            operator_means: bracket_list(means.iter().map(|(_, mean)| mean)),
            instructions_total: totals.instructions,
            cycles_total: totals.cycles,
            branch_misses_total: totals.branch_misses,
            cache_misses_total: totals.cache_misses,
            page_faults_total: totals.page_faults,
            median_time: record.median_time(),
            time_unit: record.time_unit.map(|unit| unit.label().to_owned()),
            median_memory_mb: record.median_memory_mb(),
            speedup: record.speedup,
            equivalent_test: record.equivalent_test.clone(),
        }
    }
}

/// Write rows sorted by `(is_packed, query, column_ordering)`.
///
/// Returns the number of data rows written.
pub fn write_csv<W: io::Write>(
    writer: W,
    records: &[TestRecord],
    include_header: bool,
) -> Result<usize> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    if include_header {
        csv_writer.write_record(CSV_HEADER)?;
    }
    let mut rows = 0_usize;
    for record in sorted_by_variant(records) {
        csv_writer.serialize(CsvRow::from_record(record))?;
        rows += 1;
    }
    csv_writer
        .flush()
        .map_err(|source| PacklogError::Csv(source.into()))?;
    Ok(rows)
}

/// Append rows to `path`, writing the header only when the file is new or empty.
pub fn append_csv(path: &Path, records: &[TestRecord]) -> Result<usize> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| PacklogError::io(path, source))?;
    let fresh = file
        .metadata()
        .map_err(|source| PacklogError::io(path, source))?
        .len()
        == 0;
    let rows = write_csv(file, records, fresh)?;
    debug!(path = %path.display(), rows, fresh, "appended CSV rows");
    Ok(rows)
}
