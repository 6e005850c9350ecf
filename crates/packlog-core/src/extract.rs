//! Pull typed metrics out of one run section.
//!
//! Each field is an independent pattern search. A missing field never
//! fails the others; only a missing `<path> with profiling` header makes
//! the section invalid.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::UNKNOWN;
use crate::operator::OperatorKind;
use crate::record::{RecordIdentity, TestNumber, TimeUnit};
use crate::segment::LogSection;

lazy_static! {
    static ref HEADER_RE: Regex = Regex::new(r"(.+?) with profiling").expect("header regex");
    static ref TEST_NUMBER_RE: Regex = Regex::new(r"test(\d+)").expect("test number regex");
    static ref QUERY_RE: Regex = Regex::new(r"Test \d+: ([^\r\n]+)").expect("query regex");
    static ref ORDERING_RE: Regex =
        Regex::new(r"COLUMN ORDERING: ([^\r\n]+)").expect("column ordering regex");
    // `<NAME>[ <uuid> ]: <count>` at the start of a line.
    static ref OPERATOR_RE: Regex = Regex::new(
        r"(?m)^[ \t]*(SCAN|INLJ(?:_PACKED)?\d*|SINK(?:_PACKED|_NO_OP)?)(?:[ \t][^\r\n:]*)?:[ \t]*(\d+)"
    )
    .expect("operator regex");
    static ref TIME_RE: Regex = Regex::new(
        r"Execution time:[ \t]*(\d+(?:\.\d+)?)(?:[ \t]*(ns|us|µs|ms|s)\b)?"
    )
    .expect("execution time regex");
    static ref MEMORY_RE: Regex =
        Regex::new(r"Peak Memory Usage:[ \t]*(-?\d+(?:\.\d+)?)").expect("peak memory regex");
    static ref COUNTER_RES: [(Counter, Regex); 5] = [
        (Counter::Instructions, counter_regex("instructions")),
        (Counter::Cycles, counter_regex("cycles")),
        (Counter::BranchMisses, counter_regex("branch-misses")),
        (Counter::CacheMisses, counter_regex("cache-misses")),
        (Counter::PageFaults, counter_regex("page-faults")),
    ];
}

/// A perf counter line: `  1,234,567   cpu_atom/instructions/u   # ...`.
fn counter_regex(name: &str) -> Regex {
    let pattern =
        format!(r"(?m)^[ \t]*([\d,]+)[ \t]+(?:[\w-]+/)?{name}(?:[/:]\w*)?(?:[ \t\r]|$)");
    Regex::new(&pattern).expect("counter regex")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    Instructions,
    Cycles,
    BranchMisses,
    CacheMisses,
    PageFaults,
}

/// Fields extracted from one valid run section.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSample {
    /// Last path component of the header (`test12`).
    pub test_label: String,
    pub test_number: TestNumber,
    pub query: String,
    pub column_ordering: String,
    /// Operator counts reported by this run; absent kinds are not keys.
    pub operators: BTreeMap<OperatorKind, u64>,
    pub instructions: Option<u64>,
    pub cycles: Option<u64>,
    pub branch_misses: Option<u64>,
    pub cache_misses: Option<u64>,
    pub page_faults: Option<u64>,
    /// Every `Execution time:` value in the section, as printed.
    pub elapsed_time: Vec<f64>,
    /// Unit of the first `Execution time:` line carrying one.
    pub time_unit: Option<TimeUnit>,
    pub peak_memory_mb: Vec<f64>,
}

impl RunSample {
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            test_number: self.test_number,
            query: self.query.clone(),
            column_ordering: self.column_ordering.clone(),
        }
    }
}

/// Extract a sample, or `None` when the section has no profiling header.
pub fn extract_run(section: &LogSection<'_>) -> Option<RunSample> {
    let text = section.text;
    let Some(header) = HEADER_RE.captures(text) else {
        debug!(section = section.index, "skipping section without profiling header");
        return None;
    };
    let test_path = header[1].trim();
    let test_label = test_path
        .rsplit('/')
        .next()
        .unwrap_or(test_path)
        .to_owned();

    let test_number = TEST_NUMBER_RE
        .captures(&test_label)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map_or(TestNumber::Unknown, TestNumber::Known);

    let query = first_capture(&QUERY_RE, text).unwrap_or_else(|| UNKNOWN.to_owned());
    let column_ordering = first_capture(&ORDERING_RE, text).unwrap_or_else(|| UNKNOWN.to_owned());

    let mut sample = RunSample {
        test_label,
        test_number,
        query,
        column_ordering,
        operators: extract_operators(text),
        instructions: None,
        cycles: None,
        branch_misses: None,
        cache_misses: None,
        page_faults: None,
        elapsed_time: Vec::new(),
        time_unit: None,
        peak_memory_mb: Vec::new(),
    };

    for (counter, re) in COUNTER_RES.iter() {
        let value = re
            .captures(text)
            .and_then(|caps| parse_grouped_digits(&caps[1]));
        match counter {
            Counter::Instructions => sample.instructions = value,
            Counter::Cycles => sample.cycles = value,
            Counter::BranchMisses => sample.branch_misses = value,
            Counter::CacheMisses => sample.cache_misses = value,
            Counter::PageFaults => sample.page_faults = value,
        }
    }

    for caps in TIME_RE.captures_iter(text) {
        let Ok(value) = caps[1].parse::<f64>() else {
            continue;
        };
        let unit = caps.get(2).and_then(|m| TimeUnit::from_label(m.as_str()));
        match (sample.time_unit, unit) {
            (None, Some(unit)) => sample.time_unit = Some(unit),
            (Some(seen), Some(unit)) if seen != unit => {
                warn!(
                    section = section.index,
                    first = %seen,
                    found = %unit,
                    "execution time units differ within one run; values kept as printed"
                );
            }
            _ => {}
        }
        sample.elapsed_time.push(value);
    }

    for caps in MEMORY_RE.captures_iter(text) {
        match caps[1].parse::<f64>() {
            Ok(value) if value >= 0.0 => sample.peak_memory_mb.push(value),
            Ok(value) => {
                debug!(section = section.index, value, "ignoring peak memory sentinel");
            }
            Err(_) => {}
        }
    }

    Some(sample)
}

/// Operator counts in one section; a repeated kind keeps its last value.
fn extract_operators(text: &str) -> BTreeMap<OperatorKind, u64> {
    let mut operators = BTreeMap::new();
    for caps in OPERATOR_RE.captures_iter(text) {
        let Some(kind) = OperatorKind::from_name(&caps[1]) else {
            continue;
        };
        if let Ok(count) = caps[2].parse::<u64>() {
            operators.insert(kind, count);
        }
    }
    operators
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].trim_end().to_owned())
}

/// Parse `1,234,567` style digit groups.
pub fn parse_grouped_digits(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|&ch| ch != ',').collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}
