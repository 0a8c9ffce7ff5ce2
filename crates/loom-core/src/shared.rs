//! Shared types between Loom layers
//!
//! Fundamental types used by both the lexer and the parser, kept here to
//! avoid circular dependencies between the syntax crates.

use serde::{Deserialize, Serialize};

/// Source position information carried on every token, AST node, and error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanInfo {
    /// Start line number (1-based)
    pub start_line: usize,
    /// Start column number (0-based)
    pub start_column: usize,
    /// End line number (1-based)
    pub end_line: usize,
    /// End column number (0-based)
    pub end_column: usize,
}

impl SpanInfo {
    /// Create a new span with line/column information
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        SpanInfo {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Combine two spans to create a larger span
    pub fn combine(start: SpanInfo, end: SpanInfo) -> Self {
        SpanInfo {
            start_line: start.start_line,
            start_column: start.start_column,
            end_line: end.end_line,
            end_column: end.end_column,
        }
    }

    /// Create an empty/null span (for synthetic nodes)
    pub fn empty() -> Self {
        SpanInfo {
            start_line: 0,
            start_column: 0,
            end_line: 0,
            end_column: 0,
        }
    }

    /// Create span info from byte offsets by converting to line/column
    pub fn from_byte_offsets(source: &str, start: usize, end: usize) -> Self {
        let (start_line, start_col) = byte_offset_to_line_col(source, start);
        let (end_line, end_col) = byte_offset_to_line_col(source, end);

        SpanInfo {
            start_line,
            start_column: start_col,
            end_line,
            end_column: end_col,
        }
    }
}

/// Convert byte offset to line and column numbers
fn byte_offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 0;
    let mut byte_count = 0;

    for ch in source.chars() {
        if byte_count >= offset {
            break;
        }

        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }

        byte_count += ch.len_utf8();
    }

    (line, col)
}
