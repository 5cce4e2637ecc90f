//! Decode configuration

use crate::hia::companion_path;
use crate::his::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do when a timestamp precedes the one before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampOrder {
    /// Accept any order
    Ignore,
    /// Accept, but log a warning
    #[default]
    Warn,
    /// Fail with [`HisError::NonMonotonicTimestamps`](crate::his::HisError::NonMonotonicTimestamps)
    Reject,
}

/// Options for decoding a HIS file
///
/// ```rust
/// use sobek_his::his::{DecodeOptions, TimestampOrder};
///
/// let options = DecodeOptions::from_json(
///     r#"{ "long_locations": "case1/reservoir.hia", "timestamp_order": "reject" }"#,
/// )?;
/// assert_eq!(options.timestamp_order, TimestampOrder::Reject);
/// # Ok::<(), sobek_his::his::HisError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// HIA file whose `[Long Locations]` section replaces location names
    pub long_locations: Option<PathBuf>,
    /// Handling of non-monotonic timestamps
    pub timestamp_order: TimestampOrder,
}

impl DecodeOptions {
    /// Default options: no overrides, warn on out-of-order timestamps
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge long location names from the given HIA file
    pub fn with_long_locations(mut self, path: impl Into<PathBuf>) -> Self {
        self.long_locations = Some(path.into());
        self
    }

    /// Merge long location names from the `.hia` file next to `his_path`
    pub fn with_companion(self, his_path: impl AsRef<Path>) -> Self {
        self.with_long_locations(companion_path(his_path))
    }

    /// Set the timestamp order policy
    pub fn with_timestamp_order(mut self, order: TimestampOrder) -> Self {
        self.timestamp_order = order;
        self
    }

    /// Load options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
