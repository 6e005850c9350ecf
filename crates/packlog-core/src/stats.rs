//! Guarded summary statistics over per-run sequences.
//!
//! Every helper returns `None` for empty input so callers skip the derived
//! value instead of dividing by zero.

/// Median of `values`; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(f64::midpoint(sorted[mid - 1], sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Integer mean, truncated toward zero (`sum / len`).
pub fn truncated_mean(values: &[u64]) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    let sum: u128 = values.iter().map(|&v| u128::from(v)).sum();
    u64::try_from(sum / values.len() as u128).ok()
}

/// Saturating sum; an empty sequence totals zero.
pub fn total(values: &[u64]) -> u64 {
    values.iter().fold(0_u64, |acc, &v| acc.saturating_add(v))
}
