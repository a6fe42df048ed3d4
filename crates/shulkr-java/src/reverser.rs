//! Text reversal: rewrite renamed identifiers in the new revision back to
//! their old names.
//!
//! Spans come only from the already-parsed new tree, so they are in bounds
//! and never overlap. Everything outside the rewritten identifiers stays
//! byte-identical.

use serde::Serialize;
use shulkr_core::edit::{Replacement, SpanEditor};
use shulkr_core::output::EditInfo;
use shulkr_core::patch::Span;
use shulkr_core::text::byte_offset_to_position_str;

use crate::mapping::RenameMapping;
use crate::tree::SourceTree;

/// One identifier occurrence rewritten to its old name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameEdit {
    pub span: Span,
    /// Name in the new revision.
    pub old_text: String,
    /// Name written back.
    pub new_text: String,
    pub line: u32,
    pub col: u32,
}

impl RenameEdit {
    pub fn to_info(&self) -> EditInfo {
        EditInfo {
            span: self.span,
            old_text: self.old_text.clone(),
            new_text: self.new_text.clone(),
            line: self.line,
            col: self.col,
        }
    }
}

/// Rewritten text plus the edits that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversal {
    pub text: String,
    /// Edits sorted by start offset.
    pub edits: Vec<RenameEdit>,
}

/// Collect the edits `mapping` implies for `tree`, sorted by position.
pub fn plan(source: &str, tree: &SourceTree, mapping: &RenameMapping) -> Vec<RenameEdit> {
    let mut edits = Vec::new();
    if mapping.is_empty() {
        return edits;
    }
    for decl in tree.declarations() {
        let path = &tree.scope(decl.scope).path;
        let Some(old_name) = mapping.old_name_for(path, &decl.name) else {
            continue;
        };
        for occurrence in decl.occurrences() {
            let (line, col) = byte_offset_to_position_str(source, occurrence.span.start);
            edits.push(RenameEdit {
                span: occurrence.span,
                old_text: decl.name.clone(),
                new_text: old_name.to_string(),
                line,
                col,
            });
        }
    }
    edits.sort_by_key(|edit| edit.span.start);
    edits
}

/// Rewrite `source` (the text `tree` was parsed from) using `mapping`.
pub fn reverse(source: &str, tree: &SourceTree, mapping: &RenameMapping) -> Reversal {
    let edits = plan(source, tree, mapping);
    let mut editor = SpanEditor::new(source);
    editor.add_all(
        edits
            .iter()
            .map(|edit| Replacement::new(edit.span, edit.new_text.clone())),
    );
    debug_assert_eq!(editor.validate(), Ok(()), "edits planned from a stale tree");
    Reversal {
        text: editor.apply(),
        edits,
    }
}

/// Rewrite `source` using `mapping`, returning only the text.
pub fn apply(source: &str, tree: &SourceTree, mapping: &RenameMapping) -> String {
    reverse(source, tree, mapping).text
}
