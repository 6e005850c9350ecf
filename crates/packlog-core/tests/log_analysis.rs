//! End-to-end behavior of `analyze` and the report sinks on harness-shaped logs.

use packlog_core::classify::{SinkClass, classify_sink};
use packlog_core::report::{CSV_HEADER, append_csv, render_tables, to_json, write_json};
use packlog_core::{AnalysisConfig, OperatorKind, PackedPolicy, TestNumber, analyze};

fn run_section(
    test: u64,
    query: &str,
    ordering: &str,
    operators: &[(&str, u64)],
    time: u64,
) -> String {
    let mut text = format!(
        "Running test: ./build/tests/test{test} with profiling\nTest {test}: {query}\nCOLUMN ORDERING: {ordering}\n"
    );
    for (index, (name, count)) in operators.iter().enumerate() {
        text.push_str(&format!("{name} {index} : {count}\n"));
    }
    text.push_str(&format!("Execution time: {time} us\n"));
    text
}

fn log_of(sections: &[String]) -> String {
    let mut log = String::from("cmake --build build\n[100%] Built target tests\n");
    for section in sections {
        log.push_str(section);
    }
    log
}

#[test]
fn two_runs_collapse_into_one_base_record() {
    let log = log_of(&[
        run_section(1, "a->b", "a, b", &[("SCAN", 10), ("SINK", 1)], 100),
        run_section(1, "a->b", "a, b", &[("SCAN", 10), ("SINK", 1)], 120),
    ]);
    let analysis = analyze(&log, &AnalysisConfig::with_num_runs(2)).expect("analyze");

    assert_eq!(analysis.records.len(), 1);
    let record = &analysis.records[0];
    assert_eq!(record.test_number, TestNumber::Known(1));
    assert_eq!(record.runs, 2);
    assert_eq!(record.elapsed_time, [100.0, 120.0]);
    assert_eq!(record.median_time(), Some(110.0));
    assert_eq!(record.operators[&OperatorKind::Scan], [10, 10]);
    assert!(!record.is_packed(), "case=no_packed_join");
}

#[test]
fn empty_log_produces_empty_but_valid_reports() {
    let analysis = analyze("", &AnalysisConfig::with_num_runs(3)).expect("analyze");
    assert!(analysis.records.is_empty());

    let tables = render_tables(&analysis.records);
    assert!(tables.contains("Packed Execution Results:"));
    assert_eq!(to_json(&analysis.records).expect("json"), "[]");

    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("results.csv");
    assert_eq!(append_csv(&csv_path, &analysis.records).expect("csv"), 0);
    let csv = std::fs::read_to_string(&csv_path).expect("read csv");
    assert_eq!(csv.lines().count(), 1, "case=header_only");
    assert_eq!(csv.trim_end(), CSV_HEADER.join(","));
}

#[test]
fn log_without_marker_yields_nothing() {
    let analysis = analyze(
        "Test 1: a->b\nSCAN: 10\nExecution time: 5 us\n",
        &AnalysisConfig::default(),
    )
    .expect("analyze");
    assert_eq!(analysis.sections, 0);
    assert!(analysis.records.is_empty());
}

#[test]
fn malformed_section_does_not_count_toward_quota() {
    let mut sections = vec![run_section(1, "q", "o", &[("SCAN", 1)], 10)];
    sections.push("Running test: harness crashed before profiling\n".to_owned());
    sections.push(run_section(1, "q", "o", &[("SCAN", 1)], 20));
    let analysis =
        analyze(&log_of(&sections), &AnalysisConfig::with_num_runs(2)).expect("analyze");

    assert_eq!(analysis.skipped, 1);
    assert_eq!(analysis.records.len(), 1, "case=malformed_not_a_boundary");
    assert_eq!(analysis.records[0].elapsed_time, [10.0, 20.0]);
}

#[test]
fn repeated_configuration_after_quota_is_a_new_record() {
    let section = run_section(4, "q", "o", &[("SCAN", 1)], 10);
    let log = log_of(&[section.clone(), section.clone(), section]);
    let analysis = analyze(&log, &AnalysisConfig::with_num_runs(2)).expect("analyze");

    let runs: Vec<usize> = analysis.records.iter().map(|r| r.runs).collect();
    assert_eq!(runs, [2, 1], "case=trailing_partial_group");
}

#[test]
fn packed_record_gets_speedup_from_equivalent_base() {
    let log = log_of(&[
        run_section(11, "a->b,b->c", "b, a, c", &[("SCAN", 10), ("INLJ1", 4), ("SINK", 1)], 100),
        run_section(11, "a->b,b->c", "b, a, c", &[("SCAN", 10), ("INLJ1", 4), ("SINK", 1)], 140),
        run_section(
            12,
            "a->b,b->c",
            "b, a, c",
            &[("SCAN", 10), ("INLJ_PACKED1", 4), ("SINK_PACKED", 1)],
            40,
        ),
        run_section(
            12,
            "a->b,b->c",
            "b, a, c",
            &[("SCAN", 10), ("INLJ_PACKED1", 4), ("SINK_PACKED", 1)],
            60,
        ),
    ]);
    let analysis = analyze(&log, &AnalysisConfig::with_num_runs(2)).expect("analyze");

    let packed: Vec<_> = analysis.packed().collect();
    assert_eq!(packed.len(), 1);
    assert_eq!(packed[0].equivalent_test, "11");
    assert!((packed[0].speedup - 120.0 / 50.0).abs() < 1e-9, "speedup={}", packed[0].speedup);

    let base: Vec<_> = analysis.base().collect();
    assert_eq!(base[0].speedup, 0.0, "case=base_never_annotated");
    assert!(!base[0].has_equivalent());

    let tables = render_tables(&analysis.records);
    assert!(tables.contains("2.40x"), "{tables}");
}

#[test]
fn noop_packed_record_never_matches_regular_base() {
    let log = log_of(&[
        run_section(1, "q", "o", &[("SCAN", 10), ("SINK", 1)], 100),
        run_section(2, "q", "o", &[("SCAN", 10), ("INLJ_PACKED1", 3), ("SINK_NO_OP", 1)], 50),
    ]);
    let analysis = analyze(&log, &AnalysisConfig::with_num_runs(1)).expect("analyze");

    let packed = analysis.packed().next().expect("packed record");
    assert_eq!(classify_sink(packed), SinkClass::NoOp);
    assert_eq!(packed.speedup, 0.0);
    assert!(!packed.has_equivalent(), "case=noop_vs_regular");
    assert_eq!(analysis.correlation.matched, 0);
}

#[test]
fn packed_flag_follows_policy() {
    let sections = [run_section(5, "q", "o", &[("SCAN", 1), ("INLJ2", 3), ("SINK_PACKED", 1)], 9)];
    let log = log_of(&sections);

    for (policy, expected) in [
        (PackedPolicy::JoinTag, false),
        (PackedPolicy::SinkTag, true),
        (PackedPolicy::AnyTag, true),
    ] {
        let config = AnalysisConfig {
            packed_policy: policy,
            ..AnalysisConfig::with_num_runs(1)
        };
        let analysis = analyze(&log, &config).expect("analyze");
        assert_eq!(analysis.records[0].is_packed(), expected, "case=policy_{policy}");
    }
}

#[test]
fn reports_are_idempotent() {
    let log = log_of(&[
        run_section(1, "q", "o", &[("SCAN", 10), ("SINK", 1)], 100),
        run_section(2, "q", "o", &[("SCAN", 10), ("INLJ_PACKED1", 2), ("SINK_PACKED", 1)], 50),
    ]);
    let config = AnalysisConfig::with_num_runs(1);
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    write_json(&first, &analyze(&log, &config).expect("analyze").records).expect("write first");
    write_json(&second, &analyze(&log, &config).expect("analyze").records).expect("write second");
    assert_eq!(
        std::fs::read(&first).expect("read first"),
        std::fs::read(&second).expect("read second"),
        "case=byte_identical_json"
    );
}

#[test]
fn csv_append_keeps_single_header() {
    let log = log_of(&[run_section(1, "q", "o", &[("SCAN", 10), ("SINK", 1)], 100)]);
    let analysis = analyze(&log, &AnalysisConfig::with_num_runs(1)).expect("analyze");
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("results.csv");

    append_csv(&path, &analysis.records).expect("first append");
    append_csv(&path, &analysis.records).expect("second append");

    let csv = std::fs::read_to_string(&path).expect("read csv");
    let headers = csv.lines().filter(|line| line.starts_with("test_number,")).count();
    assert_eq!(headers, 1, "case=no_duplicate_header");
    assert_eq!(csv.lines().count(), 3);
}
