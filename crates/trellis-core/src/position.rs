//! Source positions and ranges.
//!
//! All positions in Trellis use the same convention:
//! - `line` is 1-based
//! - `column` is 1-based and counts characters, not bytes
//! - `byte` is a 0-based offset into the original source text
//!
//! Ranges are half-open: `end` points just past the last character.

use std::{fmt, sync::Arc};

/// A single location in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    line: usize,
    column: usize,
    byte: usize,
}

impl Pos {
    /// The first character of a file.
    pub const START: Pos = Pos {
        line: 1,
        column: 1,
        byte: 0,
    };

    /// Create a position from its components.
    pub fn new(line: usize, column: usize, byte: usize) -> Self {
        Self { line, column, byte }
    }

    /// The 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1-based character column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// The 0-based byte offset.
    pub fn byte(&self) -> usize {
        self.byte
    }

    /// Returns the position reached after reading `text` from this position.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_core::position::Pos;
    ///
    /// let end = Pos::START.advance("ab\ncd");
    /// assert_eq!((end.line(), end.column(), end.byte()), (2, 3, 5));
    /// ```
    pub fn advance(self, text: &str) -> Pos {
        text.chars().fold(self, |mut pos, ch| {
            pos.byte += ch.len_utf8();
            if ch == '\n' {
                pos.line += 1;
                pos.column = 1;
            } else {
                pos.column += 1;
            }
            pos
        })
    }
}

impl Default for Pos {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open span of source text within a named file.
///
/// The filename is shared, so cloning a range is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    filename: Arc<str>,
    start: Pos,
    end: Pos,
}

impl Range {
    /// Create a range from explicit start and end positions.
    pub fn new(filename: impl Into<Arc<str>>, start: Pos, end: Pos) -> Self {
        Self {
            filename: filename.into(),
            start,
            end,
        }
    }

    /// Create a range that starts at `start` and covers `text`.
    pub fn covering(filename: impl Into<Arc<str>>, start: Pos, text: &str) -> Self {
        Self::new(filename, start, start.advance(text))
    }

    /// An empty range at `pos`.
    pub fn point(filename: impl Into<Arc<str>>, pos: Pos) -> Self {
        Self::new(filename, pos, pos)
    }

    /// The file this range belongs to.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The shared filename handle, for building sibling ranges.
    pub fn filename_handle(&self) -> Arc<str> {
        Arc::clone(&self.filename)
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn end(&self) -> Pos {
        self.end
    }

    /// The byte offsets covered by this range.
    pub fn bytes(&self) -> std::ops::Range<usize> {
        self.start.byte..self.end.byte
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.byte.saturating_sub(self.start.byte)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A range covering both `self` and `other`.
    pub fn union(&self, other: &Range) -> Range {
        Range {
            filename: Arc::clone(&self.filename),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Map a byte range relative to `text` onto the document.
    ///
    /// `text` must be the source text that begins at `self.start()`. Offsets
    /// past the end of `text` are clamped, and offsets that fall inside a
    /// multi-byte character are moved back to its start.
    pub fn sub_range(&self, text: &str, offsets: std::ops::Range<usize>) -> Range {
        let clamp = |mut offset: usize| {
            offset = offset.min(text.len());
            while !text.is_char_boundary(offset) {
                offset -= 1;
            }
            offset
        };
        let from = clamp(offsets.start);
        let to = clamp(offsets.end.max(offsets.start));
        let start = self.start.advance(&text[..from]);
        let end = start.advance(&text[from..to]);
        Range::new(Arc::clone(&self.filename), start, end)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.start)?;
        if self.end.line == self.start.line {
            if self.end.column > self.start.column {
                write!(f, "-{}", self.end.column)?;
            }
        } else {
            write!(f, "-{}", self.end)?;
        }
        Ok(())
    }
}
