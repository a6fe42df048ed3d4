//! Java rename-reversal engine for shulkr.
//!
//! Given two revisions of one generated Java compilation unit, this crate
//! detects local variables and parameters that were only renamed and rewrites
//! the new revision so those identifiers carry their old names again. Every
//! other byte of the new revision is preserved.
//!
//! Pipeline:
//! - [`parser`]: tree-sitter based structural parser producing a [`SourceTree`]
//! - [`aligner`]: pairs scopes of the two trees by structural path
//! - [`deriver`]: matches declarations per scope pair into a [`RenameMapping`]
//! - [`reverser`]: span-based rewrite of the new text
//! - [`analyzer`]: orchestration and the public entry points
//!
//! ```ignore
//! let old = "class A { int run(int a) { return a; } }";
//! let new = "class A { int run(int x) { return x; } }";
//! assert_eq!(shulkr_java::undo_renames("A.java", old, new)?, Some(old.to_string()));
//! ```

pub mod aligner;
pub mod analyzer;
pub mod deriver;
pub mod error;
pub mod mapping;
pub mod parser;
pub mod reverser;
pub mod tree;

pub use analyzer::{analyze, undo_renames, AnalysisReport, FileAnalysis, RenameAnalyzer};
pub use error::AnalysisError;
pub use mapping::{RenameMapping, ScopeRenames};
pub use parser::{JavaParser, StructuralParser};
pub use reverser::{RenameEdit, Reversal};
pub use tree::SourceTree;
