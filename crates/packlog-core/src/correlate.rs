//! Pair packed records with their equivalent base record.
//!
//! A base record is equivalent when `query` and `column_ordering` match
//! exactly and the two sink classes are compatible. The first candidate in
//! discovery order wins.

use serde::Serialize;
use tracing::{info, warn};

use crate::classify::{SinkClass, classify_sink, sinks_compatible};
use crate::record::TestRecord;

/// Counts produced by one correlation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationSummary {
    pub packed_records: usize,
    pub base_records: usize,
    /// Packed records that found an equivalent base record.
    pub matched: usize,
    /// Matched records whose speedup could be computed.
    pub speedups: usize,
}

/// Annotate packed records with `speedup` and `equivalent_test`.
///
/// Base records are never modified. A packed record without a compatible
/// base keeps its defaults.
pub fn correlate(records: &mut [TestRecord]) -> CorrelationSummary {
    let classes: Vec<SinkClass> = records.iter().map(classify_sink).collect();
    let bases: Vec<usize> = (0..records.len())
        .filter(|&idx| !records[idx].is_packed())
        .collect();

    let mut summary = CorrelationSummary {
        base_records: bases.len(),
        ..CorrelationSummary::default()
    };

    for idx in 0..records.len() {
        if !records[idx].is_packed() {
            continue;
        }
        summary.packed_records += 1;

        let Some(base_idx) = find_equivalent(records, &classes, &bases, idx) else {
            warn!(
                test = %records[idx].test_number,
                query = %records[idx].query,
                ordering = %records[idx].column_ordering,
                sink = %classes[idx],
                "no equivalent base record for packed record"
            );
            continue;
        };
        summary.matched += 1;

        let base_median = records[base_idx].median_time();
        let reference = records[base_idx].test_number.to_string();
        let packed = &mut records[idx];
        packed.equivalent_test = reference;

        match (base_median, packed.median_time()) {
            (Some(base), Some(packed_median)) if packed_median != 0.0 => {
                packed.speedup = base / packed_median;
                summary.speedups += 1;
            }
            _ => {
                warn!(
                    test = %packed.test_number,
                    equivalent = %packed.equivalent_test,
                    "speedup not computed: missing or zero median time"
                );
            }
        }
    }

    info!(
        packed = summary.packed_records,
        base = summary.base_records,
        matched = summary.matched,
        speedups = summary.speedups,
        "correlation complete"
    );
    summary
}

fn find_equivalent(
    records: &[TestRecord],
    classes: &[SinkClass],
    bases: &[usize],
    packed_idx: usize,
) -> Option<usize> {
    let packed = &records[packed_idx];
    bases.iter().copied().find(|&base_idx| {
        let base = &records[base_idx];
        base.query == packed.query
            && base.column_ordering == packed.column_ordering
            && sinks_compatible(classes[packed_idx], classes[base_idx])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::SinkTag;
    use crate::record::NO_EQUIVALENT;
    use crate::record::fixtures::record;

    #[test]
    fn test_speedup_is_ratio_of_medians() {
        let mut records = vec![
            record(11, "a->b", "a, b", SinkTag::Packed, true, &[40.0, 60.0]),
            record(12, "a->b", "a, b", SinkTag::Plain, false, &[100.0, 120.0, 500.0]),
        ];
        let summary = correlate(&mut records);
        assert_eq!(summary.matched, 1);
        assert!((records[0].speedup - 120.0 / 50.0).abs() < 1e-9);
        assert_eq!(records[0].equivalent_test, "12");
        assert_eq!(records[1].speedup, 0.0, "case=base_untouched");
        assert_eq!(records[1].equivalent_test, NO_EQUIVALENT);
    }

    #[test]
    fn test_first_candidate_wins() {
        let mut records = vec![
            record(2, "q", "o", SinkTag::Plain, false, &[10.0]),
            record(3, "q", "o", SinkTag::Plain, false, &[99.0]),
            record(4, "q", "o", SinkTag::Packed, true, &[5.0]),
        ];
        correlate(&mut records);
        assert_eq!(records[2].equivalent_test, "2", "case=discovery_order");
        assert_eq!(records[2].speedup, 2.0);
    }

    #[test]
    fn test_noop_never_matches_regular_or_packed() {
        let mut records = vec![
            record(1, "q", "o", SinkTag::Plain, false, &[10.0]),
            record(2, "q", "o", SinkTag::Packed, false, &[10.0]),
            record(30, "q", "o", SinkTag::NoOp, true, &[5.0]),
        ];
        let summary = correlate(&mut records);
        assert_eq!(summary.matched, 0);
        assert_eq!(records[2].equivalent_test, NO_EQUIVALENT);
        assert_eq!(records[2].speedup, 0.0);
    }

    #[test]
    fn test_noop_pairs_with_noop() {
        let mut records = vec![
            record(29, "q", "o", SinkTag::NoOp, false, &[30.0]),
            record(30, "q", "o", SinkTag::NoOp, true, &[10.0]),
        ];
        correlate(&mut records);
        assert_eq!(records[1].equivalent_test, "29");
        assert_eq!(records[1].speedup, 3.0);
    }

    #[test]
    fn test_ordering_must_match_exactly() {
        let mut records = vec![
            record(1, "q", "a, b", SinkTag::Plain, false, &[10.0]),
            record(2, "q", "b, a", SinkTag::Packed, true, &[5.0]),
        ];
        assert_eq!(correlate(&mut records).matched, 0);
    }

    #[test]
    fn test_zero_or_empty_packed_time_skips_division() {
        let mut records = vec![
            record(1, "q", "o", SinkTag::Plain, false, &[10.0]),
            record(2, "q", "o", SinkTag::Packed, true, &[0.0]),
            record(3, "q", "o", SinkTag::Packed, true, &[]),
        ];
        let summary = correlate(&mut records);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.speedups, 0);
        assert_eq!(records[1].speedup, 0.0);
        assert_eq!(records[1].equivalent_test, "1", "case=match_recorded_without_speedup");
        assert_eq!(records[2].speedup, 0.0);
    }

    #[test]
    fn test_empty_input() {
        let mut records: Vec<TestRecord> = Vec::new();
        assert_eq!(correlate(&mut records), CorrelationSummary::default());
    }
}
