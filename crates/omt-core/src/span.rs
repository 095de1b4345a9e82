//! Text positions and ranges
//!
//! Lines and characters are zero-based. Characters count UTF-16 code units,
//! which is what editors speaking LSP expect.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A position in a text document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then(self.character.cmp(&other.character))
    }
}

/// A range in a text document, `start <= end`
///
/// Ranges are half-open when they describe a token: `end` is one past its
/// last character. [`Range::contains`] still accepts `end` itself, so a
/// cursor placed right after a name counts as being on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range covering `len` UTF-16 units on a single line
    pub fn on_line(line: u32, character: u32, len: u32) -> Self {
        Self {
            start: Position::new(line, character),
            end: Position::new(line, character + len),
        }
    }

    /// Whether the position falls inside this range, both ends inclusive
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Convert a byte offset within a line to a UTF-16 column
pub fn utf16_column(line: &str, byte_offset: usize) -> u32 {
    line[..byte_offset].encode_utf16().count() as u32
}

/// UTF-16 length of a string
pub fn utf16_len(text: &str) -> u32 {
    text.encode_utf16().count() as u32
}
