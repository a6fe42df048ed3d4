//! Undo-renames workflow over a git working copy.
//!
//! For every modified source file, the base revision and the working copy
//! are handed to the rename engine. When the engine finds renamed locals, the
//! working copy is rewritten with the old names restored. Files that cannot
//! be analyzed safely are handled according to [`OnError`].

use shulkr_core::config::{Config, OnError};
use shulkr_core::error::ShulkrError;
use shulkr_core::output::{ErrorInfo, FailedFile, UndoResponse, UpdatedFile, SCHEMA_VERSION};
use shulkr_core::patch::ContentHash;
use shulkr_java::RenameAnalyzer;
use tracing::{debug, info, warn};

use crate::git::{BlobSource, ChangeStatus, ChangedFile, GitRepo, Revision};

// ============================================================================
// Report
// ============================================================================

/// Outcome of one undo run.
#[derive(Debug, Clone)]
pub struct UndoReport {
    pub base_ref: String,
    pub dry_run: bool,
    /// Set when the run did nothing at all.
    pub skipped: Option<String>,
    pub updated: Vec<UpdatedFile>,
    pub unchanged: Vec<String>,
    pub failed: Vec<FailedFile>,
}

impl UndoReport {
    fn new(base_ref: &str, dry_run: bool) -> Self {
        UndoReport {
            base_ref: base_ref.to_string(),
            dry_run,
            skipped: None,
            updated: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn skipped(base_ref: &str, dry_run: bool, reason: &str) -> Self {
        UndoReport {
            skipped: Some(reason.to_string()),
            ..UndoReport::new(base_ref, dry_run)
        }
    }

    pub fn into_response(self) -> UndoResponse {
        UndoResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            base_ref: self.base_ref,
            dry_run: self.dry_run,
            skipped: self.skipped,
            updated: self.updated,
            unchanged: self.unchanged,
            failed: self.failed,
        }
    }
}

// ============================================================================
// Per-file Planning
// ============================================================================

/// Rewrite planned for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRewrite {
    /// Working copy with renamed locals reverted.
    pub text: String,
    /// Hash of the working copy the rewrite was computed from.
    pub source_hash: ContentHash,
    pub renames: usize,
    pub edits: usize,
}

/// What the engine decided for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// No renamed locals were found.
    Unchanged,
    Reverted(PlannedRewrite),
}

/// Fetch both revisions of `file` and compute its rewrite.
///
/// Analysis errors carry `old_path -> new_path` as their file identity.
pub fn plan_file<S: BlobSource>(
    source: &S,
    base: &Revision,
    file: &ChangedFile,
) -> Result<FileOutcome, ShulkrError> {
    let old = source.fetch(base, &file.old_path)?;
    let new = source.fetch(&Revision::WorkingTree, &file.new_path)?;
    let label = file.label();

    let analysis = RenameAnalyzer::new().analyze_file(&label, &old, &new)?;
    for failure in &analysis.report().failures {
        warn!(
            file = %label,
            scope = %failure.path,
            kind = %failure.kind,
            "scope left as is: {}",
            failure.message
        );
    }
    if !analysis.has_renames() {
        return Ok(FileOutcome::Unchanged);
    }

    let reversal = analysis.rewrite();
    Ok(FileOutcome::Reverted(PlannedRewrite {
        source_hash: ContentHash::compute(new.as_bytes()),
        renames: analysis.mapping().rename_count(),
        edits: reversal.edits.len(),
        text: reversal.text,
    }))
}

fn revert_file(
    repo: &GitRepo,
    base: &Revision,
    file: &ChangedFile,
    dry_run: bool,
) -> Result<Option<UpdatedFile>, ShulkrError> {
    let plan = match plan_file(repo, base, file)? {
        FileOutcome::Unchanged => return Ok(None),
        FileOutcome::Reverted(plan) => plan,
    };
    if !dry_run {
        repo.write_file(&file.new_path, &plan.source_hash, &plan.text)?;
    }
    info!(
        file = %file.new_path,
        renames = plan.renames,
        edits = plan.edits,
        dry_run,
        "reverted renamed locals"
    );
    Ok(Some(UpdatedFile {
        path: file.new_path.clone(),
        renames: plan.renames,
        edits: plan.edits,
    }))
}

// ============================================================================
// Workflow
// ============================================================================

/// Revert renamed locals in every modified file of the working tree.
///
/// Files are compared with `config.undo.base_ref`. Only modified files whose
/// extension is listed in `config.undo.extensions` are considered. With
/// `dry_run`, nothing is written.
pub fn undo_renames(
    repo: &GitRepo,
    config: &Config,
    dry_run: bool,
) -> Result<UndoReport, ShulkrError> {
    let base_ref = config.undo.base_ref.as_str();
    if !config.undo_renamed_vars {
        info!("undo_renamed_vars is disabled, nothing to do");
        return Ok(UndoReport::skipped(
            base_ref,
            dry_run,
            "undo_renamed_vars is disabled",
        ));
    }
    if !repo.has_commits() {
        info!("repository has no commits, nothing to compare against");
        return Ok(UndoReport::skipped(base_ref, dry_run, "repository has no commits"));
    }

    let base = Revision::Commit(base_ref.to_string());
    let mut report = UndoReport::new(base_ref, dry_run);
    for file in repo.changed_files(base_ref)? {
        if file.status != ChangeStatus::Modified || !config.undo.matches_extension(&file.new_path)
        {
            debug!(file = %file.label(), status = ?file.status, "ignoring changed file");
            continue;
        }
        match revert_file(repo, &base, &file, dry_run) {
            Ok(Some(updated)) => report.updated.push(updated),
            Ok(None) => report.unchanged.push(file.new_path.clone()),
            Err(err) => match config.undo.on_error {
                OnError::Abort => return Err(err),
                OnError::Skip => {
                    warn!(file = %file.label(), "skipping file: {}", err);
                    report.failed.push(FailedFile {
                        path: file.new_path.clone(),
                        error: ErrorInfo::from_error(&err),
                    });
                }
            },
        }
    }

    info!(
        updated = report.updated.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        "undo finished"
    );
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shulkr_core::error::AnalysisErrorKind;
    use std::collections::HashMap;

    /// In-memory revisions keyed by (revision, path).
    #[derive(Default)]
    struct MemorySource {
        blobs: HashMap<(String, String), String>,
    }

    impl MemorySource {
        fn with(mut self, revision: &Revision, path: &str, text: &str) -> Self {
            self.blobs
                .insert((revision.to_string(), path.to_string()), text.to_string());
            self
        }
    }

    impl BlobSource for MemorySource {
        fn fetch(&self, revision: &Revision, path: &str) -> Result<String, ShulkrError> {
            self.blobs
                .get(&(revision.to_string(), path.to_string()))
                .cloned()
                .ok_or_else(|| ShulkrError::file_not_found(path))
        }
    }

    fn head() -> Revision {
        Revision::Commit("HEAD".to_string())
    }

    fn modified(path: &str) -> ChangedFile {
        ChangedFile {
            status: ChangeStatus::Modified,
            old_path: path.to_string(),
            new_path: path.to_string(),
        }
    }

    mod planning {
        use super::*;

        #[test]
        fn reverts_renamed_parameter() {
            let old = "class A { int run(int count) { return count; } }";
            let new = "class A { int run(int var1) { return var1; } }";
            let source = MemorySource::default()
                .with(&head(), "A.java", old)
                .with(&Revision::WorkingTree, "A.java", new);

            match plan_file(&source, &head(), &modified("A.java")).unwrap() {
                FileOutcome::Reverted(plan) => {
                    assert_eq!(plan.text, old);
                    assert_eq!(plan.renames, 1);
                    assert_eq!(plan.edits, 2);
                    assert!(plan.source_hash.matches(new.as_bytes()));
                }
                FileOutcome::Unchanged => panic!("expected a rewrite"),
            }
        }

        #[test]
        fn unchanged_when_nothing_renamed() {
            let old = "class A { int run(int count) { return count; } }";
            let new = "class A { int run(int count) { return count + 1; } }";
            let source = MemorySource::default()
                .with(&head(), "A.java", old)
                .with(&Revision::WorkingTree, "A.java", new);

            assert_eq!(
                plan_file(&source, &head(), &modified("A.java")).unwrap(),
                FileOutcome::Unchanged
            );
        }

        #[test]
        fn analysis_error_is_labelled_with_both_paths() {
            let source = MemorySource::default()
                .with(&head(), "A.java", "class A { void run() {")
                .with(&Revision::WorkingTree, "A.java", "class A {}");

            match plan_file(&source, &head(), &modified("A.java")).unwrap_err() {
                ShulkrError::Analysis { kind, file, .. } => {
                    assert_eq!(kind, AnalysisErrorKind::ParseFailure);
                    assert_eq!(file, "A.java -> A.java");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn missing_base_blob_is_reported() {
            let source =
                MemorySource::default().with(&Revision::WorkingTree, "A.java", "class A {}");
            let err = plan_file(&source, &head(), &modified("A.java")).unwrap_err();
            assert!(matches!(err, ShulkrError::FileNotFound { .. }));
        }
    }

    mod report {
        use super::*;

        #[test]
        fn skipped_report_serializes_reason() {
            let response = UndoReport::skipped("HEAD", true, "repository has no commits")
                .into_response();
            assert_eq!(response.skipped.as_deref(), Some("repository has no commits"));
            assert!(response.dry_run);
            assert!(response.updated.is_empty());
        }

        #[test]
        fn active_report_omits_skip_reason() {
            let response = UndoReport::new("main", false).into_response();
            assert_eq!(response.status, "ok");
            assert_eq!(response.base_ref, "main");
            assert!(response.skipped.is_none());
        }
    }
}
