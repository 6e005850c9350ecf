//! Aggregated test records and their identity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::operator::OperatorKind;
use crate::stats;

/// Default for `equivalent_test` when no base record matched.
pub const NO_EQUIVALENT: &str = "none";

/// Numeric test id parsed from the run label (`test12` -> 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestNumber {
    Known(u64),
    Unknown,
}

impl fmt::Display for TestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(n) => write!(f, "{n}"),
            Self::Unknown => f.write_str(crate::UNKNOWN),
        }
    }
}

impl Serialize for TestNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Unit printed after an `Execution time:` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanos,
    Micros,
    Millis,
    Seconds,
}

impl TimeUnit {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ns" => Some(Self::Nanos),
            "us" | "µs" => Some(Self::Micros),
            "ms" => Some(Self::Millis),
            "s" => Some(Self::Seconds),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Nanos => "ns",
            Self::Micros => "us",
            Self::Millis => "ms",
            Self::Seconds => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for TimeUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Grouping key: consecutive samples with equal identity share a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordIdentity {
    pub test_number: TestNumber,
    pub query: String,
    pub column_ordering: String,
}

/// Metrics for one logical configuration across its repeated runs.
///
/// Every operator sequence has exactly `runs` entries; the k-th entry
/// belongs to the k-th run, with 0 where that run did not report the
/// operator. Counter, time and memory sequences only hold reported values.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub test_number: TestNumber,
    /// Label of the first run (`test12`), kept for display.
    pub test_label: String,
    pub query: String,
    pub column_ordering: String,
    pub runs: usize,
    pub operators: BTreeMap<OperatorKind, Vec<u64>>,
    pub instructions: Vec<u64>,
    pub cycles: Vec<u64>,
    pub branch_misses: Vec<u64>,
    pub cache_misses: Vec<u64>,
    pub page_faults: Vec<u64>,
    pub elapsed_time: Vec<f64>,
    pub time_unit: Option<TimeUnit>,
    pub peak_memory_mb: Vec<f64>,
    is_packed: bool,
    /// `median(base time) / median(packed time)`; 0 when not computed.
    pub speedup: f64,
    /// Test number of the matched base record, or [`NO_EQUIVALENT`].
    pub equivalent_test: String,
}

impl TestRecord {
    /// Empty record for `identity`; the packed flag is fixed here.
    pub(crate) fn new(identity: RecordIdentity, test_label: String, is_packed: bool) -> Self {
        Self {
            test_number: identity.test_number,
            test_label,
            query: identity.query,
            column_ordering: identity.column_ordering,
            runs: 0,
            operators: BTreeMap::new(),
            instructions: Vec::new(),
            cycles: Vec::new(),
            branch_misses: Vec::new(),
            cache_misses: Vec::new(),
            page_faults: Vec::new(),
            elapsed_time: Vec::new(),
            time_unit: None,
            peak_memory_mb: Vec::new(),
            is_packed,
            speedup: 0.0,
            equivalent_test: NO_EQUIVALENT.to_owned(),
        }
    }

    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            test_number: self.test_number,
            query: self.query.clone(),
            column_ordering: self.column_ordering.clone(),
        }
    }

    pub const fn is_packed(&self) -> bool {
        self.is_packed
    }

    pub fn has_equivalent(&self) -> bool {
        self.equivalent_test != NO_EQUIVALENT
    }

    pub fn median_time(&self) -> Option<f64> {
        stats::median(&self.elapsed_time)
    }

    pub fn median_memory_mb(&self) -> Option<f64> {
        stats::median(&self.peak_memory_mb)
    }

    /// Per-operator truncated means in display order.
    pub fn operator_means(&self) -> Vec<(OperatorKind, u64)> {
        self.operators
            .iter()
            .filter_map(|(kind, counts)| stats::truncated_mean(counts).map(|mean| (*kind, mean)))
            .collect()
    }

    /// Summed hardware counters across the record's runs.
    pub fn counter_totals(&self) -> CounterTotals {
        CounterTotals {
            instructions: stats::total(&self.instructions),
            cycles: stats::total(&self.cycles),
            branch_misses: stats::total(&self.branch_misses),
            cache_misses: stats::total(&self.cache_misses),
            page_faults: stats::total(&self.page_faults),
        }
    }

    /// Ordering key for report tables.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.query, &self.column_ordering)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterTotals {
    pub instructions: u64,
    pub cycles: u64,
    pub branch_misses: u64,
    pub cache_misses: u64,
    pub page_faults: u64,
}
