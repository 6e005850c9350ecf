//! One forward pass over a benchmark log.

use packlog_error::Result;
use tracing::info;

use crate::aggregate::RunAggregator;
use crate::config::AnalysisConfig;
use crate::correlate::{CorrelationSummary, correlate};
use crate::extract::extract_run;
use crate::record::TestRecord;
use crate::segment::segment_log;

/// Sealed, correlated records plus the counts behind them.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Records in discovery order.
    pub records: Vec<TestRecord>,
    /// Sections found after the first run marker.
    pub sections: usize,
    /// Sections without a profiling header.
    pub skipped: usize,
    pub correlation: CorrelationSummary,
}

impl Analysis {
    pub fn packed(&self) -> impl Iterator<Item = &TestRecord> {
        self.records.iter().filter(|record| record.is_packed())
    }

    pub fn base(&self) -> impl Iterator<Item = &TestRecord> {
        self.records.iter().filter(|record| !record.is_packed())
    }
}

/// Segment, extract, aggregate and correlate `text`.
///
/// Fails only on an invalid configuration; malformed sections are skipped.
pub fn analyze(text: &str, config: &AnalysisConfig) -> Result<Analysis> {
    config.validate()?;
    let mut aggregator = RunAggregator::new(config.num_runs, config.packed_policy)?;

    let mut sections = 0_usize;
    let mut skipped = 0_usize;
    for section in segment_log(text, &config.run_marker) {
        sections += 1;
        match extract_run(&section) {
            Some(sample) => aggregator.push(sample),
            None => skipped += 1,
        }
    }

    let mut records = aggregator.finish();
    info!(
        sections,
        skipped,
        records = records.len(),
        quota = config.num_runs,
        policy = %config.packed_policy,
        "log aggregated"
    );
    let correlation = correlate(&mut records);

    Ok(Analysis {
        records,
        sections,
        skipped,
        correlation,
    })
}
