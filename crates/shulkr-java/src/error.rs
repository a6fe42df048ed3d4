//! Analysis errors raised by the engine.

use std::fmt;

use shulkr_core::error::{AnalysisErrorKind, ShulkrError};

use crate::tree::StructuralPath;

/// A failed analysis, classified by [`AnalysisErrorKind`].
///
/// The parser and deriver create these without a file identity; the
/// orchestrator attaches it with [`AnalysisError::in_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    pub kind: AnalysisErrorKind,
    /// File identity supplied by the caller, for diagnostics only.
    pub file: Option<String>,
    /// Rendered structural path of the offending scope.
    pub scope: Option<String>,
    pub message: String,
    /// 1-indexed (line, column) of the offending text.
    pub location: Option<(u32, u32)>,
}

impl AnalysisError {
    pub fn new(kind: AnalysisErrorKind, message: impl Into<String>) -> Self {
        AnalysisError {
            kind,
            file: None,
            scope: None,
            message: message.into(),
            location: None,
        }
    }

    pub fn parse_failure(message: impl Into<String>, location: Option<(u32, u32)>) -> Self {
        AnalysisError {
            location,
            ..AnalysisError::new(AnalysisErrorKind::ParseFailure, message)
        }
    }

    pub fn in_scope(mut self, path: &StructuralPath) -> Self {
        self.scope = Some(path.to_string());
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(file) = &self.file {
            write!(f, " in {}", file)?;
        }
        if let Some(scope) = &self.scope {
            write!(f, " at {}", scope)?;
        }
        if let Some((line, col)) = self.location {
            write!(f, " ({}:{})", line, col)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for AnalysisError {}

impl From<AnalysisError> for ShulkrError {
    fn from(err: AnalysisError) -> Self {
        let message = match err.location {
            Some((line, col)) => format!("{} at {}:{}", err.message, line, col),
            None => err.message,
        };
        ShulkrError::Analysis {
            kind: err.kind,
            file: err.file.unwrap_or_else(|| "<unknown>".to_string()),
            scope: err.scope,
            message,
        }
    }
}
