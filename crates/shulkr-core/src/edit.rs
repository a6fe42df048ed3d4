//! Span replacement editor.
//!
//! [`SpanEditor`] collects [`Replacement`]s against one source buffer and applies
//! them back-to-front, so the offsets of edits not yet applied stay valid while
//! earlier text changes length. Everything outside the replaced spans is
//! preserved byte for byte.
//!
//! # Example
//!
//! ```
//! use shulkr_core::edit::{Replacement, SpanEditor};
//! use shulkr_core::patch::Span;
//!
//! let source = "int x = 1; return x;";
//!
//! let mut editor = SpanEditor::new(source);
//! editor.add(Replacement::new(Span::new(4, 5), "count"));
//! editor.add(Replacement::new(Span::new(18, 19), "count"));
//!
//! assert!(editor.validate().is_ok());
//! let result = editor.apply();
//! assert_eq!(result, "int count = 1; return count;");
//! ```

use std::cmp::Ordering;

use crate::patch::Span;

/// Replace the bytes at `span` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub span: Span,
    pub new_text: String,
}

impl Replacement {
    pub fn new(span: Span, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }
}

/// Error type for span edit operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Two edits have overlapping spans.
    OverlappingEdits { edit1_span: Span, edit2_span: Span },

    /// An edit span extends beyond source length or splits a UTF-8 char.
    SpanOutOfBounds { span: Span, source_len: usize },
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::OverlappingEdits {
                edit1_span,
                edit2_span,
            } => {
                write!(f, "overlapping edits: {} and {}", edit1_span, edit2_span)
            }
            EditError::SpanOutOfBounds { span, source_len } => {
                write!(
                    f,
                    "span {} is out of bounds for source of length {}",
                    span, source_len
                )
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Result type for span edit operations.
pub type EditResult<T> = Result<T, EditError>;

/// Collects replacements for one source buffer and applies them atomically.
pub struct SpanEditor<'src> {
    source: &'src str,
    edits: Vec<Replacement>,
}

impl<'src> SpanEditor<'src> {
    /// Create a new editor for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Add a replacement to the batch.
    pub fn add(&mut self, edit: Replacement) {
        self.edits.push(edit);
    }

    /// Add multiple replacements.
    pub fn add_all(&mut self, edits: impl IntoIterator<Item = Replacement>) {
        self.edits.extend(edits);
    }

    /// Returns the number of edits currently queued.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Returns true if no edits are queued.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply all queued edits and return the transformed source.
    ///
    /// Spans must be in bounds, on char boundaries, and pairwise disjoint, as
    /// they are when taken from a parse of this exact source. Check other
    /// batches with [`SpanEditor::validate`] first. An empty batch returns the
    /// source unchanged.
    pub fn apply(mut self) -> String {
        if self.edits.is_empty() {
            return self.source.to_string();
        }

        sort_descending(&mut self.edits);

        let mut result = self.source.to_string();
        for edit in &self.edits {
            result.replace_range(edit.span.start..edit.span.end, &edit.new_text);
        }
        result
    }

    /// Validate edits without applying them.
    ///
    /// Returns `Ok(())` if edits are valid, or the first error encountered.
    pub fn validate(&self) -> EditResult<()> {
        let source_len = self.source.len();

        for edit in &self.edits {
            let span = edit.span;
            if span.end > source_len
                || !self.source.is_char_boundary(span.start)
                || !self.source.is_char_boundary(span.end)
            {
                return Err(EditError::SpanOutOfBounds { span, source_len });
            }
        }

        let mut sorted = self.edits.clone();
        sort_descending(&mut sorted);

        // After descending sort: prev.start >= curr.start
        for pair in sorted.windows(2) {
            let (prev, curr) = (pair[0].span, pair[1].span);
            if curr.overlaps(&prev) {
                return Err(EditError::OverlappingEdits {
                    edit1_span: curr,
                    edit2_span: prev,
                });
            }
        }

        Ok(())
    }
}

fn sort_descending(edits: &mut [Replacement]) {
    edits.sort_by(|a, b| match b.span.start.cmp(&a.span.start) {
        Ordering::Equal => b.span.end.cmp(&a.span.end),
        other => other,
    });
}
