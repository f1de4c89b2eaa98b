//! Source position tracking and span-based text editing for coolie-mid-vue.
//!
//! This crate provides byte spans, a line index for turning offsets into
//! line/column pairs, and an edit set that splices replacements back into
//! the original text without re-printing it.

use std::fmt;
use std::ops::Range;

/// Half-open byte range `[start, end)` into a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `offset`.
    #[inline]
    pub const fn empty(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the two spans share at least one byte.
    #[inline]
    pub const fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The smallest span covering both.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    #[inline]
    pub fn to_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| (i + 1) as u32))
            .collect();
        Self {
            line_starts,
            len: text.len() as u32,
        }
    }

    /// The 0-indexed position of `offset`, clamped to the end of the text.
    pub fn line_col(&self, offset: u32) -> LineCol {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        LineCol {
            line: line as u32,
            col: offset - self.line_starts[line],
        }
    }
}

/// A 0-indexed line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// 1-indexed `(line, column)` for messages.
    #[inline]
    pub const fn to_display(self) -> (u32, u32) {
        (self.line + 1, self.col + 1)
    }
}

/// A single replacement of the bytes covered by `span`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// The replaced range, measured against the unedited text.
    pub span: Span,
    /// The text written in place of the range.
    pub replacement: String,
}

impl TextEdit {
    /// Create a new edit.
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// Why an edit set could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Two edits touch the same bytes.
    Overlap(Span, Span),
    /// An edit ends past the text or cuts a UTF-8 sequence.
    OutOfBounds(Span),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overlap(a, b) => write!(f, "edits {} and {} overlap", a, b),
            Self::OutOfBounds(span) => write!(f, "edit {} is outside the text", span),
        }
    }
}

impl std::error::Error for EditError {}

/// A set of edits planned against one snapshot of a text.
///
/// All spans refer to the text as it was when the edits were planned.
/// [`EditSet::apply`] splices them rightmost-first, so an earlier splice
/// never shifts the offsets of a later one.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<TextEdit>,
}

impl EditSet {
    /// Create an empty edit set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an edit.
    pub fn push(&mut self, edit: TextEdit) {
        self.edits.push(edit);
    }

    /// Queue a replacement of `span` with `replacement`.
    pub fn replace(&mut self, span: Span, replacement: impl Into<String>) {
        self.push(TextEdit::new(span, replacement));
    }

    /// Number of queued edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Check if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every edit to `text` and return the result.
    pub fn apply(mut self, text: &str) -> Result<String, EditError> {
        self.edits.sort_by_key(|edit| (edit.span.start, edit.span.end));

        for pair in self.edits.windows(2) {
            if pair[0].span.overlaps(pair[1].span) {
                return Err(EditError::Overlap(pair[0].span, pair[1].span));
            }
        }

        for edit in &self.edits {
            let range = edit.span.to_range();
            if range.end > text.len()
                || !text.is_char_boundary(range.start)
                || !text.is_char_boundary(range.end)
            {
                return Err(EditError::OutOfBounds(edit.span));
            }
        }

        let mut output = text.to_string();
        for edit in self.edits.iter().rev() {
            output.replace_range(edit.span.to_range(), &edit.replacement);
        }
        Ok(output)
    }
}
