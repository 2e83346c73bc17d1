//! Position tracking for grammar diagnostics.
//!
//! Lines are 1-based and columns are 0-based byte offsets within the line,
//! which is what recognizers report for token positions.

use text_size::TextSize;

/// A line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Maps byte offsets to line/column positions for one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(TextSize::new(i as u32 + 1));
            }
        }
        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    /// Convert an offset to a line/column pair. Offsets past the end clamp
    /// to the end of the text.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = offset - self.line_starts[line];
        LineCol::new(line as u32 + 1, column.into())
    }

    /// Number of lines in the text.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        let index = LineIndex::new("grammar T;\nstat: ID;");
        assert_eq!(index.line_col(TextSize::new(0)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::new(8)), LineCol::new(1, 8));
    }

    #[test]
    fn test_line_col_after_newline() {
        let index = LineIndex::new("grammar T;\nstat: ID;");
        assert_eq!(index.line_col(TextSize::new(11)), LineCol::new(2, 0));
        assert_eq!(index.line_col(TextSize::new(17)), LineCol::new(2, 6));
        assert_eq!(index.line_count(), 2);
    }

    #[test]
    fn test_line_col_clamps_past_end() {
        let index = LineIndex::new("ab");
        assert_eq!(index.line_col(TextSize::new(40)), LineCol::new(1, 2));
    }
}
