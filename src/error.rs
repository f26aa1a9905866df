// src/error.rs

//! Pipeline error taxonomy
//!
//! Every failure aborts the remainder of the pipeline immediately. Nothing is
//! recovered locally: a recipe must fail loudly the moment upstream reality
//! diverges from its assumptions rather than produce a subtly wrong artifact.

use std::path::PathBuf;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the packaging pipeline
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fetched content does not match the descriptor's expected hash
    #[error("integrity check failed: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// Source unreachable or the transfer failed
    #[error("network error: {0}")]
    Network(String),

    /// Unrecognized or corrupt archive container
    #[error("archive format error: {0}")]
    Format(String),

    /// Patch search text did not occur exactly once in its target file
    #[error(
        "patch mismatch in {file}: {needle:?} found {found} time(s), expected exactly one occurrence"
    )]
    PatchMismatch {
        file: String,
        needle: String,
        found: usize,
    },

    /// An enumerated stage path does not exist in the working tree
    #[error("expected stage path missing from working tree: {}", .0.display())]
    MissingPath(PathBuf),

    /// Upstream build command returned non-zero
    #[error("build command failed with status {status}: {stderr}")]
    Build { status: i32, stderr: String },

    /// Malformed descriptor, hash string, or metadata record
    #[error("parse error: {0}")]
    Parse(String),

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
