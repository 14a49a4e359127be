//! Offset ↔ line/column conversion for diagnostic output.

use crate::ByteOffset;
use text_size::TextSize;

/// A line and column position (0-indexed; output formatting adds 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed column (byte offset within the line).
    pub col: u32,
}

impl LineCol {
    /// Creates a new line/column position.
    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Precomputed line-start table over one source file.
///
/// Built once per file when diagnostics are formatted; lookups are O(log n)
/// binary searches over the line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<ByteOffset>,
}

impl LineIndex {
    /// Builds the index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        for (offset, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }
        Self { line_starts }
    }

    /// Number of lines in the source.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset to a line/column position.
    pub fn line_col(&self, offset: ByteOffset) -> Option<LineCol> {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let line_start = *self.line_starts.get(line)?;
        Some(LineCol {
            line: line as u32,
            col: u32::from(offset) - u32::from(line_start),
        })
    }

    /// Converts a line/column position back to a byte offset.
    pub fn offset(&self, line_col: LineCol) -> Option<ByteOffset> {
        let line_start = *self.line_starts.get(line_col.line as usize)?;
        Some(line_start + TextSize::from(line_col.col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("class A {}");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_col(TextSize::from(6)), Some(LineCol::new(0, 6)));
    }

    #[test]
    fn test_multiple_lines() {
        let index = LineIndex::new("package a;\nclass B {\n}\n");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(TextSize::from(11)), Some(LineCol::new(1, 0)));
        assert_eq!(index.line_col(TextSize::from(21)), Some(LineCol::new(2, 0)));
    }

    #[test]
    fn test_roundtrip() {
        let text = "a\nbc\ndef";
        let index = LineIndex::new(text);
        for offset in 0..text.len() {
            let offset = TextSize::from(offset as u32);
            let lc = index.line_col(offset).unwrap();
            assert_eq!(index.offset(lc), Some(offset));
        }
    }
}
