//! Quota-sealed grouping of consecutive run samples into test records.
//!
//! A group is sealed when the next sample's identity differs, when it
//! reaches the run quota, or at end of input. Sealing at quota is eager: a
//! following sample with the same identity opens a fresh record, so a
//! configuration that is benchmarked again later never merges into an
//! earlier record.

use std::collections::BTreeSet;
use std::mem;

use packlog_error::{PacklogError, Result};
use tracing::{debug, warn};

use crate::config::PackedPolicy;
use crate::extract::RunSample;
use crate::operator::OperatorKind;
use crate::record::{RecordIdentity, TestRecord};

#[derive(Debug, Default)]
enum AggregatorState {
    #[default]
    NoCurrentGroup,
    Accumulating(Group),
}

#[derive(Debug)]
struct Group {
    identity: RecordIdentity,
    test_label: String,
    samples: Vec<RunSample>,
}

impl Group {
    fn open(sample: &RunSample) -> Self {
        Self {
            identity: sample.identity(),
            test_label: sample.test_label.clone(),
            samples: Vec::new(),
        }
    }

    fn accepts(&self, sample: &RunSample) -> bool {
        self.identity.test_number == sample.test_number
            && self.identity.query == sample.query
            && self.identity.column_ordering == sample.column_ordering
    }
}

/// Streaming aggregator; feed samples in log order, then call `finish`.
#[derive(Debug)]
pub struct RunAggregator {
    num_runs: usize,
    policy: PackedPolicy,
    state: AggregatorState,
    sealed: Vec<TestRecord>,
}

impl RunAggregator {
    pub fn new(num_runs: usize, policy: PackedPolicy) -> Result<Self> {
        if num_runs == 0 {
            return Err(PacklogError::InvalidRunQuota {
                value: num_runs.to_string(),
            });
        }
        Ok(Self {
            num_runs,
            policy,
            state: AggregatorState::NoCurrentGroup,
            sealed: Vec::new(),
        })
    }

    /// Samples accumulated in the open group (0 when none is open).
    pub fn pending_runs(&self) -> usize {
        match &self.state {
            AggregatorState::NoCurrentGroup => 0,
            AggregatorState::Accumulating(group) => group.samples.len(),
        }
    }

    /// Records sealed so far.
    pub fn sealed(&self) -> &[TestRecord] {
        &self.sealed
    }

    pub fn push(&mut self, sample: RunSample) {
        let mut group = match mem::take(&mut self.state) {
            AggregatorState::Accumulating(group) if group.accepts(&sample) => group,
            AggregatorState::Accumulating(previous) => {
                self.seal(previous);
                Group::open(&sample)
            }
            AggregatorState::NoCurrentGroup => Group::open(&sample),
        };
        group.samples.push(sample);

        if group.samples.len() == self.num_runs {
            self.seal(group);
        } else {
            self.state = AggregatorState::Accumulating(group);
        }
    }

    /// Seal any open group, even if it is short of the quota.
    pub fn finish(mut self) -> Vec<TestRecord> {
        if let AggregatorState::Accumulating(group) = mem::take(&mut self.state) {
            if group.samples.len() < self.num_runs {
                debug!(
                    test = %group.identity.test_number,
                    runs = group.samples.len(),
                    quota = self.num_runs,
                    "sealing truncated final group"
                );
            }
            self.seal(group);
        }
        self.sealed
    }

    fn seal(&mut self, group: Group) {
        let record = materialize(group, self.policy);
        debug!(
            test = %record.test_number,
            runs = record.runs,
            packed = record.is_packed(),
            "sealed test record"
        );
        self.sealed.push(record);
    }
}

/// Build the record, back-filling 0 for runs that omitted a known operator.
fn materialize(group: Group, policy: PackedPolicy) -> TestRecord {
    let kinds: BTreeSet<OperatorKind> = group
        .samples
        .iter()
        .flat_map(|sample| sample.operators.keys().copied())
        .collect();

    let is_packed = group.samples.iter().any(|sample| {
        sample
            .operators
            .iter()
            .any(|(kind, count)| *count > 0 && policy.counts(*kind))
    });

    let mut record = TestRecord::new(group.identity, group.test_label, is_packed);
    record.runs = group.samples.len();

    for kind in kinds {
        let counts = group
            .samples
            .iter()
            .map(|sample| sample.operators.get(&kind).copied().unwrap_or(0))
            .collect();
        record.operators.insert(kind, counts);
    }

    for sample in group.samples {
        record.instructions.extend(sample.instructions);
        record.cycles.extend(sample.cycles);
        record.branch_misses.extend(sample.branch_misses);
        record.cache_misses.extend(sample.cache_misses);
        record.page_faults.extend(sample.page_faults);
        record.elapsed_time.extend(sample.elapsed_time);
        record.peak_memory_mb.extend(sample.peak_memory_mb);
        match (record.time_unit, sample.time_unit) {
            (None, unit) => record.time_unit = unit,
            (Some(seen), Some(unit)) if seen != unit => {
                warn!(
                    test = %record.test_number,
                    first = %seen,
                    found = %unit,
                    "record mixes execution time units; values kept as printed"
                );
            }
            _ => {}
        }
    }

    record
}
