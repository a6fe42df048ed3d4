//! JSON output types and serialization for CLI responses.
//!
//! These types form the contract with whatever drives the CLI (a version
//! bumping script, CI, a human with `jq`).
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field
//! 2. **Deterministic:** Same input -> same output (maps are ordered, lists sorted)
//! 3. **Nullable vs absent:** absent field means "not applicable"
//! 4. **Versioned:** Schema version in response enables forward compatibility

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisErrorKind, OutputErrorCode, ShulkrError};
use crate::patch::Span;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Renames for one file, keyed by rendered scope path, then old name -> new name.
pub type MappingInfo = BTreeMap<String, BTreeMap<String, String>>;

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a ShulkrError.
    pub fn from_error(err: &ShulkrError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            ShulkrError::Analysis {
                kind, file, scope, ..
            } => Some(serde_json::json!({
                "kind": kind,
                "file": file,
                "scope": scope,
            })),
            ShulkrError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            ShulkrError::Git { command, stderr } => Some(serde_json::json!({
                "command": command,
                "stderr": stderr,
            })),
            ShulkrError::ApplyError { file, .. } => {
                file.as_ref().map(|f| serde_json::json!({ "file": f }))
            }
            _ => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error details.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &ShulkrError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Analysis Output
// ============================================================================

/// A scope-local analysis failure that did not abort the file.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeFailureInfo {
    pub kind: AnalysisErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub message: String,
}

/// One identifier occurrence rewritten back to its old name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditInfo {
    /// Byte span in the new revision.
    pub span: Span,
    /// Identifier text in the new revision.
    pub old_text: String,
    /// Identifier text after reverting.
    pub new_text: String,
    /// 1-indexed line.
    pub line: u32,
    /// 1-indexed column.
    pub col: u32,
}

/// Response for the `analyze` command.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// File identity used for diagnostics.
    pub file: String,
    /// Whether any rename was detected.
    pub renames_detected: bool,
    /// Detected renames (old name -> new name) per scope.
    pub mapping: MappingInfo,
    /// Number of scope pairs aligned between the two revisions.
    pub aligned_scopes: usize,
    /// Scopes present in only one revision.
    pub unaligned_scopes: usize,
    /// Scopes that contributed no mapping because they were unsafe.
    pub failures: Vec<ScopeFailureInfo>,
    /// Occurrences that would be rewritten (sorted by position).
    pub edits: Vec<EditInfo>,
}

impl AnalyzeResponse {
    pub fn new(
        file: impl Into<String>,
        mapping: MappingInfo,
        aligned_scopes: usize,
        unaligned_scopes: usize,
        failures: Vec<ScopeFailureInfo>,
        mut edits: Vec<EditInfo>,
    ) -> Self {
        edits.sort_by_key(|e| e.span.start);
        AnalyzeResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file: file.into(),
            renames_detected: mapping.values().any(|renames| !renames.is_empty()),
            mapping,
            aligned_scopes,
            unaligned_scopes,
            failures,
            edits,
        }
    }
}

// ============================================================================
// Workflow Output
// ============================================================================

/// A file whose renamed locals were reverted.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedFile {
    pub path: String,
    /// Number of rename entries applied.
    pub renames: usize,
    /// Number of identifier occurrences rewritten.
    pub edits: usize,
}

/// A file the workflow left untouched because its analysis failed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub error: ErrorInfo,
}

/// Response for the `undo` command.
#[derive(Debug, Clone, Serialize)]
pub struct UndoResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Revision the working tree was compared with.
    pub base_ref: String,
    /// True when no file was written.
    pub dry_run: bool,
    /// Why the whole run was skipped, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Files rewritten (or that would be, in a dry run).
    pub updated: Vec<UpdatedFile>,
    /// Modified files with no renames to revert.
    pub unchanged: Vec<String>,
    /// Files skipped because their analysis failed.
    pub failed: Vec<FailedFile>,
}

/// Response for the `config init` command.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInitResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Path of the written configuration file.
    pub path: String,
    /// False when an existing file was overwritten.
    pub created: bool,
}

impl ConfigInitResponse {
    pub fn new(path: impl Into<String>, created: bool) -> Self {
        ConfigInitResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            path: path.into(),
            created,
        }
    }
}

// ============================================================================
// Emit Helpers
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
