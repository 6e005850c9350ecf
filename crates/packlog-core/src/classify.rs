//! Sink classification of test records.
//!
//! This is independent of the record's packed flag: it only says which sink
//! the plan ended in, which decides whether two records are comparable.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::operator::SinkTag;
use crate::record::TestRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkClass {
    NoOp,
    Packed,
    Regular,
    Unknown,
}

impl SinkClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::Packed => "packed",
            Self::Regular => "regular",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SinkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SinkClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Classify by which sink keys the record carries.
///
/// Precedence: a no-op sink anywhere wins, then a packed sink, then a plain
/// sink. Key presence counts, even with zero counts.
pub fn classify_sink(record: &TestRecord) -> SinkClass {
    classify_sink_tags(record.operators.keys().filter_map(|kind| kind.sink_tag()))
}

pub fn classify_sink_tags<I>(tags: I) -> SinkClass
where
    I: IntoIterator<Item = SinkTag>,
{
    let mut class = SinkClass::Unknown;
    for tag in tags {
        match tag {
            SinkTag::NoOp => return SinkClass::NoOp,
            SinkTag::Packed => class = SinkClass::Packed,
            SinkTag::Plain if class == SinkClass::Unknown => class = SinkClass::Regular,
            SinkTag::Plain => {}
        }
    }
    class
}

/// Both no-op, or one packed sink against one regular sink.
pub const fn sinks_compatible(a: SinkClass, b: SinkClass) -> bool {
    matches!(
        (a, b),
        (SinkClass::NoOp, SinkClass::NoOp)
            | (SinkClass::Packed, SinkClass::Regular)
            | (SinkClass::Regular, SinkClass::Packed)
    )
}
