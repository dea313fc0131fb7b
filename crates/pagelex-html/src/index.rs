//! Line index of a page: the offsets at which each line starts.
//!
//! Offsets refer to the page's normalized text, where every line terminator is
//! a single LF. Line 0 starts at offset 0 and has no entry; each recorded entry
//! is the offset just past an LF, so `count()` is the number of line breaks
//! seen so far.

/// An append-only, strictly increasing list of line-start offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// An empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self { starts: Vec::new() }
    }

    /// Record that a line begins at `offset` (the offset just past an LF).
    ///
    /// Offsets that do not extend the index are ignored, so recording the same
    /// line twice is harmless.
    pub fn record_line_start(&mut self, offset: usize) {
        if self.starts.last().is_none_or(|&last| offset > last) {
            self.starts.push(offset);
        }
    }

    /// Number of line starts recorded.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.starts.len()
    }

    /// Zero-based line containing `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }

    /// Offset at which `line` starts. Line 0 always starts at 0.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        if line == 0 {
            Some(0)
        } else {
            self.entry_at(line - 1)
        }
    }

    /// The `i`th recorded entry.
    #[must_use]
    pub fn entry_at(&self, i: usize) -> Option<usize> {
        self.starts.get(i).copied()
    }

    /// Zero-based column of `offset` within its line.
    #[must_use]
    pub fn column_of(&self, offset: usize) -> usize {
        let line = self.line_of(offset);
        offset - self.line_start(line).unwrap_or(0)
    }

    /// Bounds of `line`, excluding its terminating LF.
    ///
    /// The last line is open ended and extends to `fill`, the page's current
    /// fill offset.
    #[must_use]
    pub fn line_span(&self, line: usize, fill: usize) -> Option<(usize, usize)> {
        let start = self.line_start(line)?;
        let end = self.entry_at(line).map_or(fill, |next| next - 1);
        Some((start, end.max(start)))
    }

    /// All recorded entries.
    #[must_use]
    pub fn entries(&self) -> &[usize] {
        &self.starts
    }
}
