use prettytable::{Cell, Row, Table, format};

use super::{bracket_list, format_memory, format_speedup, format_time};
use crate::record::TestRecord;

const MAX_QUERY_CHARS: usize = 30;
const MAX_ORDER_CHARS: usize = 20;
const MISSING: &str = "-";

const BASE_COLUMNS: [&str; 11] = [
    "Test",
    "Query",
    "Column Order",
    "Operators",
    "Instructions",
    "Cycles",
    "Branch Misses",
    "Cache Misses",
    "Page Faults",
    "Memory",
    "Time",
];
const PACKED_EXTRA_COLUMNS: [&str; 2] = ["Speedup", "Equivalent"];

/// Render the packed table followed by the base table.
///
/// Each table is sorted by `(query, column_ordering)`.
pub fn render_tables(records: &[TestRecord]) -> String {
    let mut packed: Vec<&TestRecord> = records.iter().filter(|r| r.is_packed()).collect();
    let mut base: Vec<&TestRecord> = records.iter().filter(|r| !r.is_packed()).collect();
    packed.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    base.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut out = String::new();
    out.push_str("\nPacked Execution Results:\n");
    out.push_str(&render_variant_table(&packed, true));
    out.push_str("\nBase Execution Results:\n");
    out.push_str(&render_variant_table(&base, false));
    out
}

/// Render one table; `packed` adds the speedup and equivalent columns.
pub fn render_variant_table(records: &[&TestRecord], packed: bool) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    let mut titles: Vec<&str> = BASE_COLUMNS.to_vec();
    if packed {
        titles.extend(PACKED_EXTRA_COLUMNS);
    }
    table.set_titles(centered_row(titles.iter().map(|t| (*t).to_owned())));

    for record in records {
        table.add_row(centered_row(row_cells(record, packed)));
    }
    table.to_string()
}

fn row_cells(record: &TestRecord, packed: bool) -> Vec<String> {
    let totals = record.counter_totals();
    let mut cells = vec![
        record.test_number.to_string(),
        truncate(&record.query, MAX_QUERY_CHARS),
        truncate(&record.column_ordering, MAX_ORDER_CHARS),
        bracket_list(record.operator_means().into_iter().map(|(_, mean)| mean)),
        totals.instructions.to_string(),
        totals.cycles.to_string(),
        totals.branch_misses.to_string(),
        totals.cache_misses.to_string(),
        totals.page_faults.to_string(),
        format_memory(record).unwrap_or_else(|| MISSING.to_owned()),
        format_time(record).unwrap_or_else(|| MISSING.to_owned()),
    ];
    if packed {
        cells.push(format_speedup(record).unwrap_or_else(|| MISSING.to_owned()));
        cells.push(record.equivalent_test.clone());
    }
    cells
}

fn centered_row(cells: impl IntoIterator<Item = String>) -> Row {
    Row::new(
        cells
            .into_iter()
            .map(|text| Cell::new(&text).style_spec("c"))
            .collect(),
    )
}

/// Cut to `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}
