//! Source positions
//!
//! ## Types
//!
//! - [`Position`] - A 1-based line:column position in source text
//! - [`Range`] - A byte span together with its start and end positions
//!
//! Positions are derived from byte offsets on demand by scanning backwards for line breaks.
//! Nothing is cached: positions are only needed for diagnostics and tooling, never on the
//! parsing hot path. Columns count characters, not bytes.

use std::fmt;
use std::ops::Range as ByteRange;

/// Represents a position in source text (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Locate a byte offset within `source`.
    ///
    /// Offsets past the end are clamped to the end of the source; offsets inside a multi-byte
    /// character are moved back to its first byte.
    pub fn of(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let line = before.bytes().filter(|b| *b == b'\n').count() + 1;
        let column = before[line_start..].chars().count() + 1;
        Self::new(line, column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Represents a location in source text (byte span plus start and end positions)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub span: ByteRange<usize>,
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(span: ByteRange<usize>, start: Position, end: Position) -> Self {
        Self { span, start, end }
    }

    /// Resolve both ends of a byte span against `source`
    pub fn from_span(source: &str, span: ByteRange<usize>) -> Self {
        let start = Position::of(source, span.start);
        let end = Position::of(source, span.end);
        Self::new(span, start, end)
    }

    /// Check if a position is contained within this range
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
