use std::path::{Path, PathBuf};

use thiserror::Error;

/// Primary error type for packlog operations.
///
/// Malformed run sections and missing optional metrics are not errors; they
/// are skipped or recorded as absent by the pipeline. Only configuration,
/// usage and output failures surface here.
#[derive(Error, Debug)]
pub enum PacklogError {
    // === Input / Output ===
    /// Reading or writing a file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Configuration ===
    /// Run quota is zero or not a number.
    #[error("invalid run quota '{value}': expected a positive integer")]
    InvalidRunQuota { value: String },

    /// An analysis setting is out of range.
    #[error("invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    /// Command-line arguments do not match the expected surface.
    #[error("usage error: {detail}")]
    Usage { detail: String },
}

impl PacklogError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an invalid-configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig {
            detail: detail.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(detail: impl Into<String>) -> Self {
        Self::Usage {
            detail: detail.into(),
        }
    }

    /// Whether the error was raised before any input was parsed.
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Usage { .. } | Self::InvalidRunQuota { .. } | Self::InvalidConfig { .. }
        )
    }

    /// Process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        if self.is_usage() { 2 } else { 1 }
    }
}

/// Result type alias using `PacklogError`.
pub type Result<T> = std::result::Result<T, PacklogError>;
