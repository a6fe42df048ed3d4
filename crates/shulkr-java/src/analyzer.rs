//! Analysis orchestrator: the public entry point of the engine.
//!
//! Runs the structural parser on both revisions, aligns their scopes, derives
//! the rename mapping, and hands back either the mapping, "no renames", or a
//! classified [`AnalysisError`] annotated with the caller's file identity.
//!
//! # Partial results
//!
//! A scope that mismatches or is ambiguous contributes no renames but does not
//! abort the file: the remaining scopes are still reverted. The file fails
//! only when every aligned scope holding a declaration failed, in which case
//! the first scope failure is returned.

use shulkr_core::output::AnalyzeResponse;
use tracing::debug;

use crate::aligner::align;
use crate::deriver::{derive, ScopeFailure};
use crate::error::AnalysisError;
use crate::mapping::RenameMapping;
use crate::parser::{JavaParser, StructuralParser};
use crate::reverser::{self, RenameEdit, Reversal};
use crate::tree::SourceTree;

/// Counts and per-scope failures of one file analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    /// Scope pairs present at the same structural path in both revisions.
    pub aligned_scopes: usize,
    /// Old scopes with no counterpart.
    pub unaligned_old: usize,
    /// New scopes with no counterpart.
    pub unaligned_new: usize,
    /// Aligned pairs holding at least one declaration.
    pub considered_scopes: usize,
    pub matched_declarations: usize,
    /// Scopes left out of the mapping.
    pub failures: Vec<ScopeFailure>,
}

/// Result of analyzing one file.
#[derive(Debug, Clone)]
pub struct FileAnalysis<'src> {
    file: String,
    new_source: &'src str,
    new_tree: SourceTree,
    mapping: RenameMapping,
    report: AnalysisReport,
}

impl<'src> FileAnalysis<'src> {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn mapping(&self) -> &RenameMapping {
        &self.mapping
    }

    pub fn report(&self) -> &AnalysisReport {
        &self.report
    }

    pub fn has_renames(&self) -> bool {
        !self.mapping.is_empty()
    }

    /// The mapping, or `None` when no renames were detected.
    pub fn into_mapping(self) -> Option<RenameMapping> {
        if self.mapping.is_empty() {
            None
        } else {
            Some(self.mapping)
        }
    }

    /// Edits the mapping implies for the new revision.
    pub fn edits(&self) -> Vec<RenameEdit> {
        reverser::plan(self.new_source, &self.new_tree, &self.mapping)
    }

    /// The new revision with renamed identifiers reverted.
    pub fn rewrite(&self) -> Reversal {
        reverser::reverse(self.new_source, &self.new_tree, &self.mapping)
    }

    pub fn to_response(&self) -> AnalyzeResponse {
        AnalyzeResponse::new(
            self.file.clone(),
            self.mapping.to_info(),
            self.report.aligned_scopes,
            self.report.unaligned_old + self.report.unaligned_new,
            self.report.failures.iter().map(ScopeFailure::to_info).collect(),
            self.edits().iter().map(RenameEdit::to_info).collect(),
        )
    }
}

/// Stateless analyzer over a [`StructuralParser`].
#[derive(Debug, Clone, Default)]
pub struct RenameAnalyzer<P = JavaParser> {
    parser: P,
}

impl RenameAnalyzer<JavaParser> {
    pub fn new() -> Self {
        Self::with_parser(JavaParser::new())
    }
}

impl<P: StructuralParser> RenameAnalyzer<P> {
    pub fn with_parser(parser: P) -> Self {
        RenameAnalyzer { parser }
    }

    fn parse(&self, file: &str, revision: &str, source: &str) -> Result<SourceTree, AnalysisError> {
        self.parser.parse(source).map_err(|err| {
            AnalysisError {
                message: format!("{} revision: {}", revision, err.message),
                ..err
            }
            .in_file(file)
        })
    }

    /// Analyze one file's old and new revision.
    ///
    /// `file` is used for diagnostics only.
    pub fn analyze_file<'src>(
        &self,
        file: &str,
        old_source: &str,
        new_source: &'src str,
    ) -> Result<FileAnalysis<'src>, AnalysisError> {
        let old_tree = self.parse(file, "old", old_source)?;
        let new_tree = self.parse(file, "new", new_source)?;

        let alignment = align(&old_tree, &new_tree);
        let derivation = derive(&alignment);
        debug!(
            file,
            aligned = alignment.len(),
            renamed_scopes = derivation.mapping.len(),
            failed_scopes = derivation.failures.len(),
            "derived rename mapping"
        );

        if derivation.all_failed() {
            if let Some(failure) = derivation.failures.first() {
                return Err(failure.to_error().in_file(file));
            }
        }

        let report = AnalysisReport {
            aligned_scopes: alignment.len(),
            unaligned_old: alignment.unaligned_old(),
            unaligned_new: alignment.unaligned_new(),
            considered_scopes: derivation.considered_scopes,
            matched_declarations: derivation.matched_declarations,
            failures: derivation.failures,
        };
        Ok(FileAnalysis {
            file: file.to_string(),
            new_source,
            new_tree,
            mapping: derivation.mapping,
            report,
        })
    }
}

/// Derive the rename mapping for one file, or `None` when nothing was renamed.
pub fn analyze(
    file: &str,
    old_source: &str,
    new_source: &str,
) -> Result<Option<RenameMapping>, AnalysisError> {
    RenameAnalyzer::new()
        .analyze_file(file, old_source, new_source)
        .map(FileAnalysis::into_mapping)
}

/// Revert renamed locals in `new_source`, or `None` when nothing was renamed.
pub fn undo_renames(
    file: &str,
    old_source: &str,
    new_source: &str,
) -> Result<Option<String>, AnalysisError> {
    let analysis = RenameAnalyzer::new().analyze_file(file, old_source, new_source)?;
    if !analysis.has_renames() {
        return Ok(None);
    }
    Ok(Some(reverser::apply(new_source, &analysis.new_tree, &analysis.mapping)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shulkr_core::error::AnalysisErrorKind;

    #[test]
    fn identical_sources_report_no_renames() {
        let source = "class A { void run(int a) { int b = a; } }";
        assert_eq!(analyze("A.java", source, source).unwrap(), None);
    }

    #[test]
    fn parse_failure_names_file_and_revision() {
        let err = analyze("A.java", "class A { void run() { }", "class A {}").unwrap_err();
        assert_eq!(err.kind, AnalysisErrorKind::ParseFailure);
        assert_eq!(err.file.as_deref(), Some("A.java"));
        assert!(err.message.starts_with("old revision"));
    }

    #[test]
    fn single_failing_scope_escalates() {
        let err = analyze(
            "A.java",
            "class A { void run() { int a = 1; } }",
            "class A { void run() { int a = 1; int b = 2; } }",
        )
        .unwrap_err();
        assert_eq!(err.kind, AnalysisErrorKind::StructuralMismatch);
        assert_eq!(err.scope.as_deref(), Some("A/run()"));
    }

    #[test]
    fn failing_scope_does_not_block_others() {
        let analyzer = RenameAnalyzer::new();
        let analysis = analyzer
            .analyze_file(
                "A.java",
                "class A { void run() { int a = 1; } void stop(int s) { } }",
                "class A { void run() { int a = 1; int b = 2; } void stop(int t) { } }",
            )
            .unwrap();
        assert!(analysis.has_renames());
        assert_eq!(analysis.report().failures.len(), 1);
        assert_eq!(analysis.report().considered_scopes, 2);
        assert_eq!(
            analysis.rewrite().text,
            "class A { void run() { int a = 1; int b = 2; } void stop(int s) { } }"
        );
    }

    #[test]
    fn response_lists_mapping_and_edits() {
        let analyzer = RenameAnalyzer::new();
        let analysis = analyzer
            .analyze_file(
                "A.java",
                "class A { int run(int a) { return a; } }",
                "class A { int run(int x) { return x; } }",
            )
            .unwrap();
        let response = analysis.to_response();
        assert!(response.renames_detected);
        assert_eq!(response.mapping["A/run(int)"]["a"], "x");
        assert_eq!(response.edits.len(), 2);
        assert_eq!(response.aligned_scopes, 1);
    }

    #[test]
    fn undo_renames_returns_rewritten_text() {
        let old = "class A { int run(int a) { return a; } }";
        let new = "class A { int run(int x) { return x; } }";
        assert_eq!(undo_renames("A.java", old, new).unwrap().as_deref(), Some(old));
        assert_eq!(undo_renames("A.java", old, old).unwrap(), None);
    }
}
