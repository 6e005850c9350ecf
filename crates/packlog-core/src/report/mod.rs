//! Report sinks for correlated test records.
//!
//! Each sink is independent and accepts an empty record set: the table
//! renders headers only, CSV writes a header row only, JSON writes `[]`.

mod csv_sink;
mod json_sink;
mod table;

pub use self::csv_sink::{CSV_HEADER, CsvRow, append_csv, write_csv};
pub use self::json_sink::{Counters, JsonRecord, to_json, write_json};
pub use self::table::{render_tables, render_variant_table};

use crate::record::TestRecord;

/// Records ordered by `(is_packed, query, column_ordering)`, base first.
pub fn sorted_by_variant(records: &[TestRecord]) -> Vec<&TestRecord> {
    let mut sorted: Vec<&TestRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.is_packed()
            .cmp(&b.is_packed())
            .then_with(|| a.sort_key().cmp(&b.sort_key()))
    });
    sorted
}

/// Ordered `[a b c]` rendering used by the table and CSV operator columns.
pub(crate) fn bracket_list<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    let joined: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    format!("[{}]", joined.join(" "))
}

pub(crate) fn format_time(record: &TestRecord) -> Option<String> {
    record.median_time().map(|median| match record.time_unit {
        Some(unit) => format!("{median:.0} {unit}"),
        None => format!("{median:.0}"),
    })
}

pub(crate) fn format_memory(record: &TestRecord) -> Option<String> {
    record.median_memory_mb().map(|mb| format!("{mb:.2}MB"))
}

pub(crate) fn format_speedup(record: &TestRecord) -> Option<String> {
    (record.speedup > 0.0).then(|| format!("{:.2}x", record.speedup))
}
