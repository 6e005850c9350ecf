//! Benchmark log analysis for packed vs. base query execution.
//!
//! The pipeline is strictly forward:
//!
//! ```text
//! raw log text
//!   -> segment    (run sections, split at the run-start marker)
//!   -> extract    (one RunSample per valid section)
//!   -> aggregate  (quota-sealed TestRecords)
//!   -> classify   (sink class per record)
//!   -> correlate  (packed <-> base speedup)
//!   -> report     (table / CSV / JSON / experiment ledger)
//! ```
//!
//! [`pipeline::analyze`] runs every stage for one log and owns no state
//! beyond the call, so independent logs can be processed in any order.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod correlate;
pub mod experiment;
pub mod extract;
pub mod operator;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod segment;
pub mod stats;

pub use config::{AnalysisConfig, PackedPolicy};
pub use operator::{OperatorKind, SinkTag};
pub use packlog_error::{PacklogError, Result};
pub use pipeline::{Analysis, analyze};
pub use record::{TestNumber, TestRecord};

/// Sentinel used when a query or column ordering is not reported.
pub const UNKNOWN: &str = "unknown";
