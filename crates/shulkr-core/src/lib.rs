//! Core infrastructure for shulkr.
//!
//! This crate provides language-agnostic infrastructure:
//! - Spans and content hashes
//! - Span replacement editor
//! - Error types and error codes
//! - JSON output types for CLI responses
//! - Repository configuration (`.shulkr`)
//! - Text position utilities

pub mod config;
pub mod edit;
pub mod error;
pub mod output;
pub mod patch;
pub mod text;
