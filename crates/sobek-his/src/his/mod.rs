//! HIS binary time-series container
//!
//! A HIS file is laid out as follows (`Month` variant, little-endian):
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 120 | free-text title |
//! | 120 | 40 | time-info: `T0: YYYY.MM.DD HH:MM:SS  (scu=<step>s)` |
//! | 160 | 4 | parameter count `P` (`i32`) |
//! | 164 | 4 | location count `L` (`i32`) |
//! | 168 | 20 x P | parameter names |
//! | 168 + 20P | 24 x L | location records: `i32` number, 20-byte name |
//! | after | repeating | `i32` tick offset, then `P x L` `f32` values |
//!
//! Values inside a record are location-major: all parameters of the first
//! location, then all parameters of the second, and so on. The `Year`
//! variant inserts one padding byte after the counts and shortens the last
//! parameter name field to 19 bytes. Both directions take these widths from
//! [`HisLayout`].
//!
//! The number of records is not stored; it follows from the file size.

pub mod container;
pub mod error;
pub mod frame;
pub mod header;
pub mod layout;
pub mod names;
pub mod options;
pub mod series;
pub(crate) mod text;

pub use container::{HisContainer, HisContainerBuilder};
pub use error::{HisError, Result};
pub use frame::SeriesFrame;
pub use header::{HisHeader, START_FORMAT, decode_header, encode_header};
pub use layout::{
    FileType, HisLayout, LOCATION_RECORD_LEN, NAME_WIDTH, PREAMBLE_LEN, TIME_INFO_LEN, TITLE_LEN,
};
pub use names::{Location, LocationTable, ParameterTable, decode_names, encode_names};
pub use options::{DecodeOptions, TimestampOrder};
pub use series::{Record, RecordReader, TimeSeriesCube, decode_series, encode_series};
