//! HIS header parsing and building

use crate::his::error::{HisError, Result};
use crate::his::layout::{FileType, HisLayout, STEP_FIELD_START, TIME_INFO_LEN, TITLE_LEN};
use crate::his::text::{decode_field, decode_latin1, encode_field};
use binrw::{BinRead, BinWrite};
use chrono::{NaiveDateTime, TimeDelta};
use std::io::{Read, Seek, Write};

/// `strftime` pattern of the start timestamp inside the time-info block
pub const START_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// On-disk preamble: title, time-info and the two counts
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little)]
#[bw(little)]
struct RawPreamble {
    title: [u8; TITLE_LEN],
    time_info: [u8; TIME_INFO_LEN],
    parameter_count: i32,
    location_count: i32,
}

/// HIS file header
///
/// The header holds:
/// - Free-text title (120 bytes, kept verbatim)
/// - Time-info block (40 bytes): `T0: YYYY.MM.DD HH:MM:SS  (scu=<step>s)`
/// - Parameter count (4 bytes, little-endian)
/// - Location count (4 bytes, little-endian)
/// - One padding byte for the `Year` variant
///
/// A decoded header keeps its time-info block verbatim and writes it back
/// unchanged while `start`, `step_seconds` and `file_type` still match it.
/// Equality ignores the kept block.
#[derive(Debug, Clone)]
pub struct HisHeader {
    /// Free-text title, byte-for-byte as stored
    pub title: [u8; TITLE_LEN],
    /// Timestamp of tick offset zero
    pub start: NaiveDateTime,
    /// Seconds per tick ("scu")
    pub step_seconds: i32,
    /// Layout variant
    pub file_type: FileType,
    /// Number of parameters
    pub parameter_count: usize,
    /// Number of locations
    pub location_count: usize,
    /// Time-info block as read from disk
    time_info: Option<[u8; TIME_INFO_LEN]>,
}

impl PartialEq for HisHeader {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.start == other.start
            && self.step_seconds == other.step_seconds
            && self.file_type == other.file_type
            && self.parameter_count == other.parameter_count
            && self.location_count == other.location_count
    }
}

impl Eq for HisHeader {}

impl HisHeader {
    /// Create a header with a space-padded title and zero counts
    pub fn new(
        title: &str,
        start: NaiveDateTime,
        step_seconds: i32,
        file_type: FileType,
    ) -> Result<Self> {
        let mut padded = [b' '; TITLE_LEN];
        padded.copy_from_slice(&encode_field(title, TITLE_LEN)?);
        Ok(Self {
            title: padded,
            start,
            step_seconds,
            file_type,
            parameter_count: 0,
            location_count: 0,
            time_info: None,
        })
    }

    /// Title with trailing padding removed
    pub fn title_text(&self) -> String {
        decode_field(&self.title)
    }

    /// Byte layout implied by this header
    pub fn layout(&self) -> Result<HisLayout> {
        HisLayout::new(self.file_type, self.parameter_count, self.location_count)
    }

    /// Timestamp of a record with the given tick offset
    pub fn timestamp(&self, tick: i32) -> Option<NaiveDateTime> {
        let seconds = i64::from(tick) * i64::from(self.step_seconds);
        self.start.checked_add_signed(TimeDelta::try_seconds(seconds)?)
    }

    /// Tick offset of a timestamp, rounded to the nearest whole tick
    ///
    /// With a zero step every record sits at `start`, which maps to tick 0.
    pub fn tick(&self, timestamp: NaiveDateTime) -> Option<i32> {
        if self.step_seconds == 0 {
            return (timestamp == self.start).then_some(0);
        }
        let seconds = (timestamp - self.start).num_milliseconds() as f64 / 1000.0;
        let tick = (seconds / f64::from(self.step_seconds)).round();
        if tick < f64::from(i32::MIN) || tick > f64::from(i32::MAX) {
            return None;
        }
        Some(tick as i32)
    }

    /// The 40-byte time-info block to write
    ///
    /// The block read from disk is reused while it still describes this
    /// header; otherwise a fresh one is rendered.
    fn time_info(&self) -> Result<[u8; TIME_INFO_LEN]> {
        if let Some(kept) = self.time_info
            && parse_start(&kept).ok() == Some(self.start)
            && FileType::detect(&kept) == Some((self.file_type, self.step_seconds))
        {
            return Ok(kept);
        }
        self.render_time_info()
    }

    fn render_time_info(&self) -> Result<[u8; TIME_INFO_LEN]> {
        let field = self.file_type.step_field();
        let prefix = format!("T0: {}  (scu=", self.start.format(START_FORMAT));
        if prefix.len() != STEP_FIELD_START {
            return Err(HisError::MalformedHeader(format!(
                "start timestamp {} does not fit the time-info block",
                self.start
            )));
        }
        let step = format!("{:>width$}", self.step_seconds, width = field.len());
        if self.step_seconds <= 0 || step.len() != field.len() {
            return Err(HisError::InvalidStepUnit(self.step_seconds));
        }

        let mut block = [b' '; TIME_INFO_LEN];
        block[..STEP_FIELD_START].copy_from_slice(prefix.as_bytes());
        block[field.clone()].copy_from_slice(step.as_bytes());
        block[field.end..].copy_from_slice(self.file_type.step_trailer());
        Ok(block)
    }
}

/// Parse the start timestamp out of a time-info block
///
/// Spaces in the date part are read as zeros, so `2019. 1. 1` is accepted.
fn parse_start(time_info: &[u8; TIME_INFO_LEN]) -> Result<NaiveDateTime> {
    let date = decode_latin1(&time_info[4..14]).replace(' ', "0");
    let time = decode_latin1(&time_info[14..23]);
    let text = format!("{date}{time}");
    NaiveDateTime::parse_from_str(&text, START_FORMAT)
        .map_err(|e| HisError::MalformedHeader(format!("start timestamp {text:?}: {e}")))
}

fn count(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| HisError::MalformedHeader(format!("negative {what} count {value}")))
}

/// Decode the preamble, counts and (for `Year` files) the padding byte
pub fn decode_header<R: Read + Seek>(reader: &mut R) -> Result<HisHeader> {
    let raw = RawPreamble::read(reader)?;

    let start = parse_start(&raw.time_info)?;
    let (file_type, step_seconds) = FileType::detect(&raw.time_info).ok_or_else(|| {
        HisError::MalformedHeader(format!(
            "unparsable step unit in {:?}",
            decode_latin1(&raw.time_info)
        ))
    })?;

    let header = HisHeader {
        title: raw.title,
        start,
        step_seconds,
        file_type,
        parameter_count: count(raw.parameter_count, "parameter")?,
        location_count: count(raw.location_count, "location")?,
        time_info: Some(raw.time_info),
    };

    for _ in 0..file_type.padding_len() {
        u8::read_le(reader)?;
    }

    Ok(header)
}

/// Encode the preamble, counts and (for `Year` files) the padding byte
pub fn encode_header<W: Write + Seek>(writer: &mut W, header: &HisHeader) -> Result<()> {
    let too_many = |what: &str, n: usize| {
        HisError::MalformedHeader(format!("{what} count {n} does not fit in 32 bits"))
    };

    let raw = RawPreamble {
        title: header.title,
        time_info: header.time_info()?,
        parameter_count: i32::try_from(header.parameter_count)
            .map_err(|_| too_many("parameter", header.parameter_count))?,
        location_count: i32::try_from(header.location_count)
            .map_err(|_| too_many("location", header.location_count))?,
    };
    raw.write(writer)?;

    for _ in 0..header.file_type.padding_len() {
        b' '.write_le(writer)?;
    }

    Ok(())
}
