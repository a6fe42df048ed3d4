//! Command implementations behind the `shulkr` binary.
//!
//! Each function does the work of one subcommand and returns the response
//! to print. Argument parsing and JSON emission stay in `main.rs`.
//!
//! ## Error Handling
//!
//! All functions return `Result<T, ShulkrError>`, so the binary can map any
//! failure to a stable exit code and an error response.

use std::fs;
use std::io;
use std::path::Path;

use shulkr_core::config::{Config, OnError};
use shulkr_core::error::ShulkrError;
use shulkr_core::output::{AnalyzeResponse, ConfigInitResponse, UndoResponse};
use shulkr_java::RenameAnalyzer;
use tracing::info;

use crate::git::GitRepo;
use crate::undo::undo_renames;

// ============================================================================
// analyze
// ============================================================================

fn read_source(path: &Path) -> Result<String, ShulkrError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ShulkrError::file_not_found(path.display().to_string()),
        _ => ShulkrError::invalid_args(format!("cannot read {}: {}", path.display(), e)),
    })
}

fn file_identity(new_path: &Path, file_name: Option<&str>) -> String {
    file_name
        .map(str::to_string)
        .unwrap_or_else(|| new_path.display().to_string())
}

/// Analyze two revisions of one file and report the detected renames.
///
/// `file_name` overrides the identity used in diagnostics (defaults to the
/// new revision's path).
pub fn run_analyze(
    old_path: &Path,
    new_path: &Path,
    file_name: Option<&str>,
) -> Result<AnalyzeResponse, ShulkrError> {
    let old = read_source(old_path)?;
    let new = read_source(new_path)?;
    let file = file_identity(new_path, file_name);

    let analysis = RenameAnalyzer::new().analyze_file(&file, &old, &new)?;
    Ok(analysis.to_response())
}

/// Rewrite the new revision with renamed locals reverted.
///
/// With no detected renames the new revision comes back unchanged.
pub fn run_rewrite(
    old_path: &Path,
    new_path: &Path,
    file_name: Option<&str>,
) -> Result<String, ShulkrError> {
    let old = read_source(old_path)?;
    let new = read_source(new_path)?;
    let file = file_identity(new_path, file_name);

    let analysis = RenameAnalyzer::new().analyze_file(&file, &old, &new)?;
    Ok(analysis.rewrite().text)
}

// ============================================================================
// undo
// ============================================================================

/// Command-line overrides for the `[undo]` configuration section.
#[derive(Debug, Clone, Default)]
pub struct UndoOptions {
    pub dry_run: bool,
    pub base_ref: Option<String>,
    pub on_error: Option<OnError>,
}

/// Revert renamed locals in the repository containing `repo_path`.
pub fn run_undo(repo_path: &Path, options: UndoOptions) -> Result<UndoResponse, ShulkrError> {
    let repo = GitRepo::open(repo_path)?;
    let mut config = Config::load_from_repo(repo.root())?;
    if let Some(base_ref) = options.base_ref {
        config.undo.base_ref = base_ref;
    }
    if let Some(on_error) = options.on_error {
        config.undo.on_error = on_error;
    }
    info!(
        base_ref = %config.undo.base_ref,
        on_error = %config.undo.on_error,
        dry_run = options.dry_run,
        "undoing renamed locals"
    );

    let report = undo_renames(&repo, &config, options.dry_run)?;
    Ok(report.into_response())
}

// ============================================================================
// config
// ============================================================================

/// Write a default `.shulkr` into the repository root.
///
/// An existing file is only replaced with `force`.
pub fn run_config_init(repo_path: &Path, force: bool) -> Result<ConfigInitResponse, ShulkrError> {
    let config_path = Config::path_in(repo_path);
    let exists = config_path.exists();
    if exists && !force {
        return Err(ShulkrError::invalid_args(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }
    let written = Config::default().save(repo_path)?;
    info!(path = %written.display(), "wrote default configuration");
    Ok(ConfigInitResponse::new(written.display().to_string(), !exists))
}

// ============================================================================
// Tests
// ============================================================================
