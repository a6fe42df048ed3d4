//! Error types and error code constants for shulkr.
//!
//! This module provides a unified error type (`ShulkrError`) that bridges
//! domain-specific errors from the analysis engine, git collaborator, and
//! configuration layer into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Analysis failed (parse failure, structural mismatch, ambiguous mapping)
//! - `4`: Apply errors (failed to write a reverted file back)
//! - `10`: Internal errors (git invocation, IO, unexpected state)

use std::fmt;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed config).
    InvalidArguments = 2,
    /// A file could not be analyzed safely.
    AnalysisFailed = 3,
    /// Failed to write changes back.
    ApplyError = 4,
    /// Internal errors (git, IO, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Analysis Error Kinds
// ============================================================================

/// Classification of a failed rename analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisErrorKind {
    /// Input is not valid source for the supported grammar.
    ParseFailure,
    /// Two aligned scopes differ in declaration count or declared types.
    StructuralMismatch,
    /// No safe one-to-one mapping could be derived for a scope.
    AmbiguousMapping,
}

impl AnalysisErrorKind {
    /// Returns the string representation used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisErrorKind::ParseFailure => "parse_failure",
            AnalysisErrorKind::StructuralMismatch => "structural_mismatch",
            AnalysisErrorKind::AmbiguousMapping => "ambiguous_mapping",
        }
    }
}

impl fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum ShulkrError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The rename analysis of a file failed.
    #[error("{kind} in {file}: {message}")]
    Analysis {
        kind: AnalysisErrorKind,
        file: String,
        scope: Option<String>,
        message: String,
    },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A git invocation failed.
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    /// Failed to write changes back.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&ShulkrError> for OutputErrorCode {
    fn from(err: &ShulkrError) -> Self {
        match err {
            ShulkrError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ShulkrError::Config(_) => OutputErrorCode::InvalidArguments,
            ShulkrError::FileNotFound { .. } => OutputErrorCode::InvalidArguments,
            ShulkrError::Analysis { .. } => OutputErrorCode::AnalysisFailed,
            ShulkrError::ApplyError { .. } => OutputErrorCode::ApplyError,
            ShulkrError::Git { .. } => OutputErrorCode::InternalError,
            ShulkrError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<ShulkrError> for OutputErrorCode {
    fn from(err: ShulkrError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl From<std::io::Error> for ShulkrError {
    fn from(err: std::io::Error) -> Self {
        ShulkrError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl ShulkrError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ShulkrError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        ShulkrError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ShulkrError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
