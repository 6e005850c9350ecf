//! Closed operator vocabulary reported by the benchmark harness.
//!
//! The harness prints one line per physical operator, e.g.
//! `INLJ_PACKED2 7f3a : 1042`. Only the names below are recognized; any
//! other token is ignored by the extractor.

use std::fmt;

use serde::{Serialize, Serializer};

/// Tag carried by a sink operator name.
///
/// Variant order is the display order: `SINK_NO_OP`, `SINK_PACKED`, `SINK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SinkTag {
    NoOp,
    Packed,
    Plain,
}

/// One operator kind from the fixed vocabulary.
///
/// The derived ordering is the column order used by every report:
/// scan, plain joins by variant id, packed joins by variant id, then sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperatorKind {
    Scan,
    /// Indexed nested-loop join, optionally numbered (`INLJ`, `INLJ3`).
    Inlj { variant: Option<u32> },
    /// Packed indexed nested-loop join (`INLJ_PACKED`, `INLJ_PACKED1`).
    InljPacked { variant: Option<u32> },
    Sink(SinkTag),
}

impl OperatorKind {
    /// Parse an operator name exactly as the harness prints it.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCAN" => return Some(Self::Scan),
            "SINK" => return Some(Self::Sink(SinkTag::Plain)),
            "SINK_PACKED" => return Some(Self::Sink(SinkTag::Packed)),
            "SINK_NO_OP" => return Some(Self::Sink(SinkTag::NoOp)),
            _ => {}
        }
        if let Some(rest) = name.strip_prefix("INLJ_PACKED") {
            return parse_variant(rest).map(|variant| Self::InljPacked { variant });
        }
        if let Some(rest) = name.strip_prefix("INLJ") {
            return parse_variant(rest).map(|variant| Self::Inlj { variant });
        }
        None
    }

    /// Whether the name carries the `PACKED` tag (join or sink).
    pub const fn carries_packed_tag(self) -> bool {
        matches!(self, Self::InljPacked { .. } | Self::Sink(SinkTag::Packed))
    }

    pub const fn is_packed_join(self) -> bool {
        matches!(self, Self::InljPacked { .. })
    }

    pub const fn is_packed_sink(self) -> bool {
        matches!(self, Self::Sink(SinkTag::Packed))
    }

    pub const fn sink_tag(self) -> Option<SinkTag> {
        match self {
            Self::Sink(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Empty suffix means "unnumbered"; anything else must be all digits.
fn parse_variant(suffix: &str) -> Option<Option<u32>> {
    if suffix.is_empty() {
        return Some(None);
    }
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<u32>().ok().map(Some)
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => f.write_str("SCAN"),
            Self::Inlj { variant: None } => f.write_str("INLJ"),
            Self::Inlj { variant: Some(n) } => write!(f, "INLJ{n}"),
            Self::InljPacked { variant: None } => f.write_str("INLJ_PACKED"),
            Self::InljPacked { variant: Some(n) } => write!(f, "INLJ_PACKED{n}"),
            Self::Sink(SinkTag::Plain) => f.write_str("SINK"),
            Self::Sink(SinkTag::Packed) => f.write_str("SINK_PACKED"),
            Self::Sink(SinkTag::NoOp) => f.write_str("SINK_NO_OP"),
        }
    }
}

impl Serialize for OperatorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
