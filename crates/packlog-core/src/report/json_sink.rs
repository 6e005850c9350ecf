use std::collections::BTreeMap;
use std::path::Path;

use packlog_error::{PacklogError, Result};
use serde::Serialize;
use tracing::debug;

use super::sorted_by_variant;
use crate::classify::{SinkClass, classify_sink};
use crate::operator::OperatorKind;
use crate::record::{CounterTotals, TestNumber, TestRecord, TimeUnit};

/// JSON view of one test record, full sequences included.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRecord<'a> {
    pub test_number: TestNumber,
    pub test_label: &'a str,
    pub query: &'a str,
    pub column_ordering: &'a str,
    pub is_packed: bool,
    pub sink_class: SinkClass,
    pub runs: usize,
    pub operators: BTreeMap<OperatorKind, &'a [u64]>,
    pub operator_means: BTreeMap<OperatorKind, u64>,
    pub counter_totals: CounterTotals,
    pub counters: Counters<'a>,
    pub median_time: Option<f64>,
    pub time_unit: Option<TimeUnit>,
    pub elapsed_time: &'a [f64],
    pub median_memory_mb: Option<f64>,
    pub peak_memory_mb: &'a [f64],
    pub speedup: f64,
    pub equivalent_test: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Counters<'a> {
    pub instructions: &'a [u64],
    pub cycles: &'a [u64],
    pub branch_misses: &'a [u64],
    pub cache_misses: &'a [u64],
    pub page_faults: &'a [u64],
}

impl<'a> JsonRecord<'a> {
    pub fn from_record(record: &'a TestRecord) -> Self {
        Self {
            test_number: record.test_number,
            test_label: &record.test_label,
            query: &record.query,
            column_ordering: &record.column_ordering,
            is_packed: record.is_packed(),
            sink_class: classify_sink(record),
            runs: record.runs,
            operators: record
                .operators
                .iter()
                .map(|(kind, counts)| (*kind, counts.as_slice()))
                .collect(),
            operator_means: record.operator_means().into_iter().collect(),
            counter_totals: record.counter_totals(),
            counters: Counters {
                instructions: &record.instructions,
                cycles: &record.cycles,
                branch_misses: &record.branch_misses,
                cache_misses: &record.cache_misses,
                page_faults: &record.page_faults,
            },
            median_time: record.median_time(),
            time_unit: record.time_unit,
            elapsed_time: &record.elapsed_time,
            median_memory_mb: record.median_memory_mb(),
            peak_memory_mb: &record.peak_memory_mb,
            speedup: record.speedup,
            equivalent_test: &record.equivalent_test,
        }
    }
}

/// Pretty-printed JSON array, sorted like the CSV rows.
pub fn to_json(records: &[TestRecord]) -> Result<String> {
    let view: Vec<JsonRecord<'_>> = sorted_by_variant(records)
        .into_iter()
        .map(JsonRecord::from_record)
        .collect();
    Ok(serde_json::to_string_pretty(&view)?)
}

/// Overwrite `path` with the JSON array.
pub fn write_json(path: &Path, records: &[TestRecord]) -> Result<()> {
    let mut payload = to_json(records)?;
    payload.push('\n');
    std::fs::write(path, payload).map_err(|source| PacklogError::io(path, source))?;
    debug!(path = %path.display(), records = records.len(), "wrote JSON report");
    Ok(())
}
