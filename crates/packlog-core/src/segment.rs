//! Split raw log text into per-run sections.

use std::iter::Skip;
use std::str::Split;

/// Raw text of one run attempt, borrowed from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSection<'a> {
    /// Zero-based position among all sections of the log.
    pub index: usize,
    pub text: &'a str,
}

/// Lazy iterator over the sections of a log.
///
/// Text before the first marker is discarded. The iterator is `Clone`, so a
/// consumer can restart it without re-reading the input.
#[derive(Debug, Clone)]
pub struct LogSections<'a> {
    inner: Skip<Split<'a, &'a str>>,
    next_index: usize,
}

impl<'a> Iterator for LogSections<'a> {
    type Item = LogSection<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.inner.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(LogSection { index, text })
    }
}

/// Segment `text` at every occurrence of `marker`.
///
/// An empty marker yields no sections.
pub fn segment_log<'a>(text: &'a str, marker: &'a str) -> LogSections<'a> {
    // `"".split("")` would yield every char boundary; skipping everything
    // keeps an empty marker inert instead.
    let skip = if marker.is_empty() { usize::MAX } else { 1 };
    LogSections {
        inner: text.split(marker).skip(skip),
        next_index: 0,
    }
}
