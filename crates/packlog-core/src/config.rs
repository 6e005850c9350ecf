//! Per-invocation analysis settings.

use std::fmt;

use packlog_error::{PacklogError, Result};
use serde::{Deserialize, Serialize};

use crate::operator::OperatorKind;

/// Literal token the harness prints before every run.
pub const DEFAULT_RUN_MARKER: &str = "Running test:";

/// Which operator tags decide that a test record is a packed execution.
///
/// Two generations of the reporting scripts disagreed here; the choice is
/// explicit so reports state which predicate produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackedPolicy {
    /// A packed indexed-join reported a non-zero count.
    #[default]
    JoinTag,
    /// A packed sink reported a non-zero count.
    SinkTag,
    /// Either of the above.
    AnyTag,
}

impl PackedPolicy {
    /// Parse the CLI spelling (`join`, `sink`, `any`).
    pub fn from_str_loose(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "join" | "join_tag" | "join-tag" => Some(Self::JoinTag),
            "sink" | "sink_tag" | "sink-tag" => Some(Self::SinkTag),
            "any" | "any_tag" | "any-tag" => Some(Self::AnyTag),
            _ => None,
        }
    }

    /// Whether a non-zero count for `kind` marks the record as packed.
    pub const fn counts(self, kind: OperatorKind) -> bool {
        match self {
            Self::JoinTag => kind.is_packed_join(),
            Self::SinkTag => kind.is_packed_sink(),
            Self::AnyTag => kind.carries_packed_tag(),
        }
    }
}

impl fmt::Display for PackedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoinTag => f.write_str("join"),
            Self::SinkTag => f.write_str("sink"),
            Self::AnyTag => f.write_str("any"),
        }
    }
}

/// Settings for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Token that starts every run section.
    pub run_marker: String,
    /// Runs per logical configuration before a record is sealed.
    pub num_runs: usize,
    pub packed_policy: PackedPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            run_marker: DEFAULT_RUN_MARKER.to_owned(),
            num_runs: 1,
            packed_policy: PackedPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    #[must_use]
    pub fn with_num_runs(num_runs: usize) -> Self {
        Self {
            num_runs,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.run_marker.is_empty() {
            return Err(PacklogError::config("run marker must not be empty"));
        }
        if self.num_runs == 0 {
            return Err(PacklogError::InvalidRunQuota {
                value: self.num_runs.to_string(),
            });
        }
        Ok(())
    }
}

/// Parse a run quota from its command-line spelling.
pub fn parse_run_quota(value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(PacklogError::InvalidRunQuota {
            value: value.to_owned(),
        }),
    }
}
