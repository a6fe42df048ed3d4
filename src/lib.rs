//! Shulkr: keeps generated Java sources diffable across versions.
//!
//! Decompiled sources of consecutive versions differ in the names assigned to
//! local variables and parameters even where the logic did not change. This
//! crate reverts those renames in the working tree of a git repository so the
//! resulting diff shows only real changes.

// Core infrastructure - re-exported from shulkr-core
pub use shulkr_core::config;
pub use shulkr_core::error;
pub use shulkr_core::output;

// Rename engine
pub use shulkr_java as java;

// Collaborators and workflow
pub mod cli;
pub mod git;
pub mod undo;
