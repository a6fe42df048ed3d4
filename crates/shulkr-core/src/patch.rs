//! Spans and content hashes shared by the analysis engine and the workflow.
//!
//! - [`Span`] is the byte range every parsed identifier occurrence is recorded with
//! - [`ContentHash`] guards write-back of working-copy files

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        ContentHash(hex::encode(result))
    }

    /// Check whether `data` hashes to this value.
    pub fn matches(&self, data: &[u8]) -> bool {
        *self == ContentHash::compute(data)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if a byte offset falls inside this span.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod span_tests {
        use super::*;

        #[test]
        fn adjacent_spans_do_not_overlap() {
            let a = Span::new(0, 5);
            let b = Span::new(5, 9);
            assert!(!a.overlaps(&b));
            assert!(!b.overlaps(&a));
        }

        #[test]
        fn intersecting_spans_overlap() {
            let a = Span::new(0, 6);
            let b = Span::new(5, 9);
            assert!(a.overlaps(&b));
        }

        #[test]
        fn contains_is_inclusive_of_bounds() {
            let outer = Span::new(10, 20);
            assert!(outer.contains(&Span::new(10, 20)));
            assert!(outer.contains(&Span::new(12, 15)));
            assert!(!outer.contains(&Span::new(9, 15)));
            assert!(outer.contains_offset(10));
            assert!(!outer.contains_offset(20));
        }

        #[test]
        #[should_panic(expected = "must be <= end")]
        fn inverted_span_panics() {
            let _ = Span::new(5, 4);
        }

        #[test]
        fn display_is_half_open() {
            assert_eq!(Span::new(3, 7).to_string(), "[3, 7)");
        }

        #[test]
        fn from_range() {
            assert_eq!(Span::from(2..4), Span::new(2, 4));
        }
    }

    mod content_hash_tests {
        use super::*;

        #[test]
        fn same_bytes_same_hash() {
            let a = ContentHash::compute(b"class A {}");
            let b = ContentHash::compute(b"class A {}");
            assert_eq!(a, b);
            assert_eq!(a.0.len(), 64);
        }

        #[test]
        fn matches_detects_changes() {
            let hash = ContentHash::compute(b"int a;");
            assert!(hash.matches(b"int a;"));
            assert!(!hash.matches(b"int b;"));
        }
    }
}
