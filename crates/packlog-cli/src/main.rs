use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use packlog_core::config::{DEFAULT_RUN_MARKER, parse_run_quota};
use packlog_core::experiment::{ExperimentMeta, append_experiment};
use packlog_core::report::{append_csv, render_tables, write_json};
use packlog_core::{Analysis, AnalysisConfig, PackedPolicy, UNKNOWN, analyze};
use packlog_error::{PacklogError, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PACKLOG_LOG";
const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, PartialEq, Eq)]
struct CliConfig {
    log_path: PathBuf,
    csv_path: Option<PathBuf>,
    json_path: Option<PathBuf>,
    experiment: Option<ExperimentTarget>,
    analysis: AnalysisConfig,
}

#[derive(Debug, PartialEq, Eq)]
struct ExperimentTarget {
    name: String,
    dir: PathBuf,
}

const USAGE: &str = "\
packlog - packed vs. base benchmark log analysis

USAGE:
    packlog <LOG_FILE> <NUM_RUNS> [CSV_OUTPUT|-] [JSON_OUTPUT] [OPTIONS]

ARGS:
    <LOG_FILE>       Benchmark harness log to analyze
    <NUM_RUNS>       Runs per test configuration (positive integer)
    [CSV_OUTPUT]     Append one row per test record; `-` skips CSV
    [JSON_OUTPUT]    Overwrite with a JSON array of test records

OPTIONS:
    --packed-policy <join|sink|any>   Operator tag that marks a packed run (default join)
    --marker <TEXT>                   Run-start marker (default \"Running test:\")
    --experiment <NAME>               Append to the experiment ledger under this name
    --experiment-dir <DIR>            Ledger directory (required with --experiment)
    -h, --help                        Show this help

ENVIRONMENT:
    PACKLOG_LOG, RUST_LOG             tracing filter for stderr logs (default warn)
";

fn print_help() {
    println!("{USAGE}");
}

fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| PacklogError::usage(format!("{flag} requires a value")))
}

/// `Ok(None)` means help was requested.
fn parse_args(args: &[String]) -> Result<Option<CliConfig>> {
    let mut positional: Vec<&str> = Vec::new();
    let mut policy = PackedPolicy::default();
    let mut marker = DEFAULT_RUN_MARKER.to_owned();
    let mut experiment_name: Option<String> = None;
    let mut experiment_dir: Option<PathBuf> = None;

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(None),
            "--packed-policy" => {
                let value = take_value(args, &mut index, "--packed-policy")?;
                policy = PackedPolicy::from_str_loose(value).ok_or_else(|| {
                    PacklogError::usage(format!(
                        "invalid --packed-policy value: {value} (expected join|sink|any)"
                    ))
                })?;
            }
            "--marker" => {
                marker = take_value(args, &mut index, "--marker")?.to_owned();
            }
            "--experiment" => {
                experiment_name = Some(take_value(args, &mut index, "--experiment")?.to_owned());
            }
            "--experiment-dir" => {
                experiment_dir = Some(PathBuf::from(take_value(
                    args,
                    &mut index,
                    "--experiment-dir",
                )?));
            }
            flag if flag.starts_with('-') && flag != "-" => {
                return Err(PacklogError::usage(format!("unknown option: {flag}")));
            }
            value => positional.push(value),
        }
        index += 1;
    }

    let (log_path, quota, csv, json) = match positional.as_slice() {
        [log, quota] => (*log, *quota, None, None),
        [log, quota, csv] => (*log, *quota, Some(*csv), None),
        [log, quota, csv, json] => (*log, *quota, Some(*csv), Some(*json)),
        _ => {
            return Err(PacklogError::usage(format!(
                "expected 2 to 4 positional arguments, got {}",
                positional.len()
            )));
        }
    };

    let experiment = match (experiment_name, experiment_dir) {
        (Some(name), Some(dir)) => Some(ExperimentTarget { name, dir }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(PacklogError::usage("--experiment requires --experiment-dir"));
        }
        (None, Some(_)) => {
            return Err(PacklogError::usage("--experiment-dir requires --experiment"));
        }
    };

    let analysis = AnalysisConfig {
        run_marker: marker,
        num_runs: parse_run_quota(quota)?,
        packed_policy: policy,
    };
    analysis.validate()?;

    Ok(Some(CliConfig {
        log_path: PathBuf::from(log_path),
        csv_path: csv.filter(|path| *path != "-").map(PathBuf::from),
        json_path: json.map(PathBuf::from),
        experiment,
        analysis,
    }))
}

fn init_logging() {
    let filter = env::var(LOG_ENV)
        .or_else(|_| env::var("RUST_LOG"))
        .map_or_else(|_| EnvFilter::new(DEFAULT_FILTER), EnvFilter::new);
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Commit of the working directory, or `unknown` outside a git checkout.
fn git_commit_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|stdout| stdout.trim().to_owned())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

fn summary_line(analysis: &Analysis) -> String {
    format!(
        "{} packed, {} base, {} correlated ({} with speedup) from {} sections ({} skipped)",
        analysis.correlation.packed_records,
        analysis.correlation.base_records,
        analysis.correlation.matched,
        analysis.correlation.speedups,
        analysis.sections,
        analysis.skipped,
    )
}

fn read_log(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| PacklogError::io(path, source))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn run(config: &CliConfig) -> Result<()> {
    let text = read_log(&config.log_path)?;
    let analysis = analyze(&text, &config.analysis)?;

    print!("{}", render_tables(&analysis.records));
    println!("\n{}", summary_line(&analysis));

    if let Some(path) = &config.csv_path {
        let rows = append_csv(path, &analysis.records)?;
        info!(path = %path.display(), rows, "CSV report appended");
    }
    if let Some(path) = &config.json_path {
        write_json(path, &analysis.records)?;
        info!(path = %path.display(), "JSON report written");
    }
    if let Some(target) = &config.experiment {
        let meta = ExperimentMeta::now(target.name.clone(), git_commit_hash());
        let id = append_experiment(&target.dir, &meta, &config.analysis, &analysis.records)?;
        println!("Results written to experiment {id} in {}", target.dir.display());
    }
    Ok(())
}

fn exit_code(error: &PacklogError) -> ExitCode {
    ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(1))
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            eprintln!("ERROR {error}");
            eprintln!("{USAGE}");
            return exit_code(&error);
        }
    };

    init_logging();
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERROR packlog failed: {error}");
            exit_code(&error)
        }
    }
}
