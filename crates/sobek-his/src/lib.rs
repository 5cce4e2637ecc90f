//! Reader and writer for SOBEK/RIBASIM HIS time-series files
//!
#![allow(clippy::cast_possible_wrap)] // Counts are stored as signed 32-bit integers
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::cast_precision_loss)] // Tick rounding goes through f64
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::float_cmp)] // Values are compared bit-for-bit in tests
#![allow(clippy::needless_pass_by_value)] // Builder arguments
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! HIS files are the fixed-layout binary containers written by the SOBEK and
//! RIBASIM hydrological models. Each file holds a cube of `f32` values indexed
//! by parameter, time step and location, together with the parameter names,
//! the location names and a start timestamp.
//!
//! # Supported Formats
//!
//! - **HIS**: the binary time-series container, in both the `Month` and the
//!   `Year` layout variant
//! - **HIA**: the INI-style companion file whose `[Long Locations]` section
//!   supplies location names longer than the 20 bytes the HIS file can hold
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: every decoded container can be encoded again
//! - **One Layout Descriptor**: field widths and size arithmetic for both
//!   directions come from [`his::HisLayout`]
//! - **Atomic Decode**: a failed decode never yields a partial container
//! - **Round-Trip Guarantee**: `decode(encode(c)) == c`
//!
//! # Example
//!
//! ```rust,no_run
//! use sobek_his::his::HisContainer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let his = HisContainer::open_with_overrides("reservoir.his", "reservoir.hia")?;
//! let frame = his.select("Storage", &["Lake Victoria outlet"])?;
//!
//! for (date, row) in frame.dates().iter().zip(&frame.rows) {
//!     println!("{date}: {row:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// HIA companion file parsing and long location name substitution
pub mod hia;
/// HIS binary time-series container
///
/// Decoding runs the header, name table and record codecs in file order and
/// assembles a [`his::HisContainer`]. Encoding is the exact mirror.
pub mod his;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

/// Common trait for binary formats that can be parsed and rebuilt
pub trait BinaryFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
