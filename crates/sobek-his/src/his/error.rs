//! Error types for HIS file decoding and encoding

use crate::hia::HiaError;
use thiserror::Error;

/// Errors that can occur when decoding or encoding HIS files
#[derive(Error, Debug)]
pub enum HisError {
    /// Unparsable date/time or step-unit text, or negative counts
    #[error("Malformed HIS header: {0}")]
    MalformedHeader(String),

    /// The byte stream ended early or does not hold a whole number of records
    #[error("Truncated HIS file: {0}")]
    TruncatedFile(String),

    /// No parameter matches the lookup key after normalization
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// No location matches the lookup key after normalization
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Encoded output length disagrees with the layout arithmetic
    #[error("Encoded size mismatch: expected {expected} bytes, wrote {actual}")]
    SizeMismatch {
        /// Byte count the layout descriptor predicts
        expected: usize,
        /// Byte count actually written
        actual: usize,
    },

    /// Container fields disagree on a dimension
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which dimension or field disagrees
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Step unit cannot be written into the time-info block
    #[error("Invalid step unit: {0} seconds")]
    InvalidStepUnit(i32),

    /// Tick offset or timestamp falls outside the representable range
    #[error("Timestamp overflow at time step {step}")]
    TimestampOverflow {
        /// Zero-based time step index
        step: usize,
    },

    /// A timestamp is earlier than its predecessor (strict decoding only)
    #[error("Timestamp at step {step} precedes the previous one")]
    NonMonotonicTimestamps {
        /// Zero-based time step index of the offending record
        step: usize,
    },

    /// Text holds characters that ISO-8859-1 cannot represent
    #[error("Text cannot be encoded as ISO-8859-1: {0:?}")]
    UnencodableText(String),

    /// Decode options could not be deserialized
    #[error("Invalid decode options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// Companion HIA file could not be loaded
    #[error(transparent)]
    Overrides(#[from] HiaError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `BinRW` parsing/writing error
    #[error("Binary format error: {0}")]
    BinRw(#[source] binrw::Error),
}

impl From<binrw::Error> for HisError {
    fn from(err: binrw::Error) -> Self {
        if err.is_eof() {
            Self::TruncatedFile(err.to_string())
        } else {
            Self::BinRw(err)
        }
    }
}

/// Type alias for HIS operation results
pub type Result<T> = std::result::Result<T, HisError>;
