//! Source glob expansion and matching over root-relative paths.

mod source_patterns;

pub use source_patterns::{PatternError, SourcePatterns};

/// Per-project directory for files the tool itself creates.
pub const STATE_DIR: &str = ".scriptpipe";
