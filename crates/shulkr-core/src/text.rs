//! Text position utilities for byte offset and line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes

use crate::patch::Span;

/// Convert a byte offset to 1-indexed line and column (Unicode-aware).
///
/// Columns count Unicode scalar values (chars), not bytes.
/// Offsets past the end of `content` report the position after the last char.
pub fn byte_offset_to_position_str(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current_offset = 0usize;

    for ch in content.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

/// Extract the text content of a span as a string.
///
/// Returns `None` if the span extends beyond content bounds or splits a char.
pub fn extract_span_str<'a>(content: &'a str, span: &Span) -> Option<&'a str> {
    content.get(span.start..span.end)
}

/// Count the number of lines in the content.
pub fn line_count(content: &str) -> u32 {
    let newlines = content.bytes().filter(|&b| b == b'\n').count() as u32;
    if content.is_empty() {
        0
    } else if content.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Return the full text of the 1-indexed line containing `offset`, without its newline.
pub fn line_at_offset(content: &str, offset: usize) -> &str {
    let offset = offset.min(content.len());
    let start = content[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let end = content[offset..]
        .find('\n')
        .map(|p| offset + p)
        .unwrap_or(content.len());
    &content[start..end]
}
