//! Error types for HIA companion file loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading a HIA file
#[derive(Error, Debug)]
pub enum HiaError {
    /// The companion file does not exist
    #[error("HIA override file missing: {}", .0.display())]
    OverrideFileMissing(PathBuf),

    /// A line could not be parsed
    #[error("HIA parse error on line {line}: {reason}")]
    OverrideParse {
        /// One-based line number
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for HIA operation results
pub type Result<T> = std::result::Result<T, HiaError>;
