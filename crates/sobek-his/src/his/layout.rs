//! Shared byte layout for both decode and encode
//!
//! Every width, offset and size computed here is used by the reading and the
//! writing half of the codec alike, so a `Year` file is written with exactly
//! the padding byte and short last parameter name that decoding expects.

use crate::his::error::{HisError, Result};
use crate::his::text::decode_latin1;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Length of the free-text title block
pub const TITLE_LEN: usize = 120;
/// Length of the time-info block (start timestamp and step unit)
pub const TIME_INFO_LEN: usize = 40;
/// Title, time-info and the two 32-bit counts
pub const PREAMBLE_LEN: usize = TITLE_LEN + TIME_INFO_LEN + 8;
/// Width of a parameter or location name field
pub const NAME_WIDTH: usize = 20;
/// Location number (i32) plus name
pub const LOCATION_RECORD_LEN: usize = 4 + NAME_WIDTH;
/// Offset of the step-unit digits inside the time-info block
pub const STEP_FIELD_START: usize = 30;

/// HIS layout variant
///
/// The variant is not stored explicitly. It is inferred from where the
/// step-unit digits end inside the time-info block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Digits fill bytes 30..38, followed by `s)`
    Month,
    /// Digits fill bytes 30..37, followed by a 3-byte trailer; one padding
    /// byte precedes the name tables and the last parameter name is 19 bytes
    Year,
}

impl FileType {
    /// Candidates in detection order
    pub const DETECTION_ORDER: [Self; 2] = [Self::Month, Self::Year];

    /// Byte range of the step-unit digits inside the time-info block
    pub fn step_field(self) -> Range<usize> {
        match self {
            Self::Month => STEP_FIELD_START..TIME_INFO_LEN - 2,
            Self::Year => STEP_FIELD_START..TIME_INFO_LEN - 3,
        }
    }

    /// Bytes written after the step-unit digits
    pub fn step_trailer(self) -> &'static [u8] {
        match self {
            Self::Month => b"s)",
            Self::Year => b"s) ",
        }
    }

    /// Padding bytes between the counts and the parameter names
    pub fn padding_len(self) -> usize {
        match self {
            Self::Month => 0,
            Self::Year => 1,
        }
    }

    /// Width of parameter name field `index` in a table of `count` names
    pub fn parameter_width(self, index: usize, count: usize) -> usize {
        match self {
            Self::Year if index + 1 == count => NAME_WIDTH - 1,
            _ => NAME_WIDTH,
        }
    }

    /// Number of leading characters that take part in a parameter lookup
    pub fn parameter_key_width(self) -> usize {
        match self {
            Self::Month => NAME_WIDTH,
            Self::Year => NAME_WIDTH - 1,
        }
    }

    /// Infer the layout variant and step unit from a time-info block
    ///
    /// The `Month` field width is tried first and the `Year` width is the
    /// fallback.
    pub fn detect(time_info: &[u8]) -> Option<(Self, i32)> {
        Self::DETECTION_ORDER.into_iter().find_map(|file_type| {
            let field = time_info.get(file_type.step_field())?;
            decode_latin1(field)
                .trim()
                .parse::<i32>()
                .ok()
                .map(|step| (file_type, step))
        })
    }
}

/// Byte layout of one HIS file, derived from its variant and counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HisLayout {
    file_type: FileType,
    parameter_count: usize,
    location_count: usize,
    data_offset: usize,
    record_len: usize,
}

impl HisLayout {
    /// Compute the layout, rejecting counts whose sizes overflow
    pub fn new(file_type: FileType, parameter_count: usize, location_count: usize) -> Result<Self> {
        let overflow = || {
            HisError::MalformedHeader(format!(
                "{parameter_count} parameters x {location_count} locations overflow"
            ))
        };

        let short_last = usize::from(file_type == FileType::Year && parameter_count > 0);
        let parameter_table = parameter_count
            .checked_mul(NAME_WIDTH)
            .ok_or_else(overflow)?
            - short_last;
        let location_table = location_count
            .checked_mul(LOCATION_RECORD_LEN)
            .ok_or_else(overflow)?;
        let data_offset = [file_type.padding_len(), parameter_table, location_table]
            .into_iter()
            .try_fold(PREAMBLE_LEN, usize::checked_add)
            .ok_or_else(overflow)?;
        let record_len = parameter_count
            .checked_mul(location_count)
            .and_then(|values| values.checked_mul(4))
            .and_then(|bytes| bytes.checked_add(4))
            .ok_or_else(overflow)?;

        Ok(Self {
            file_type,
            parameter_count,
            location_count,
            data_offset,
            record_len,
        })
    }

    /// Layout variant
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Number of parameters
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Number of locations
    pub fn location_count(&self) -> usize {
        self.location_count
    }

    /// Width of parameter name field `index`
    pub fn parameter_width(&self, index: usize) -> usize {
        self.file_type.parameter_width(index, self.parameter_count)
    }

    /// Number of leading characters compared by a parameter lookup
    pub fn parameter_key_width(&self) -> usize {
        self.file_type.parameter_key_width()
    }

    /// Offset of the first time-step record
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// Size of one time-step record: tick offset plus `P * L` values
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    /// Number of values in one record
    pub fn values_per_record(&self) -> usize {
        self.parameter_count * self.location_count
    }

    /// Derive the time-step count from the total stream length
    pub fn time_step_count(&self, total_len: u64) -> Result<usize> {
        let total_len = usize::try_from(total_len)
            .map_err(|_| HisError::TruncatedFile(format!("{total_len} bytes is not addressable")))?;
        let body = total_len.checked_sub(self.data_offset).ok_or_else(|| {
            HisError::TruncatedFile(format!(
                "{total_len} bytes is shorter than the {} byte header and name tables",
                self.data_offset
            ))
        })?;
        if body % self.record_len != 0 {
            return Err(HisError::TruncatedFile(format!(
                "{body} record bytes is not a multiple of the {} byte record size",
                self.record_len
            )));
        }
        Ok(body / self.record_len)
    }

    /// Exact encoded size for `time_steps` records
    pub fn expected_len(&self, time_steps: usize) -> Option<usize> {
        time_steps
            .checked_mul(self.record_len)?
            .checked_add(self.data_offset)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn time_info(text: &str) -> Vec<u8> {
        assert_eq!(text.len(), TIME_INFO_LEN);
        text.as_bytes().to_vec()
    }

    #[test]
    fn test_detect_month() {
        let info = time_info("T0: 2019.01.01 00:00:00  (scu=   86400s)");
        assert_eq!(FileType::detect(&info), Some((FileType::Month, 86400)));
    }

    #[test]
    fn test_detect_year_fallback() {
        let info = time_info("T0: 2019.01.01 00:00:00  (scu=  86400s) ");
        assert_eq!(FileType::detect(&info), Some((FileType::Year, 86400)));
    }

    #[test]
    fn test_detect_failure() {
        let info = time_info("T0: 2019.01.01 00:00:00  (scu=    dayss)");
        assert_eq!(FileType::detect(&info), None);
        assert_eq!(FileType::detect(b"short"), None);
    }

    #[test]
    fn test_month_layout() {
        let layout = HisLayout::new(FileType::Month, 3, 2).unwrap();
        assert_eq!(layout.data_offset(), 168 + 60 + 48);
        assert_eq!(layout.record_len(), 4 + 3 * 2 * 4);
        assert_eq!(layout.parameter_width(2), 20);
        assert_eq!(layout.expected_len(5), Some(276 + 5 * 28));
    }

    #[test]
    fn test_year_layout() {
        let layout = HisLayout::new(FileType::Year, 3, 2).unwrap();
        assert_eq!(layout.parameter_width(0), 20);
        assert_eq!(layout.parameter_width(1), 20);
        assert_eq!(layout.parameter_width(2), 19);
        // Padding byte and the short last name cancel out
        assert_eq!(layout.data_offset(), 168 + 1 + 59 + 48);
    }

    #[test]
    fn test_year_layout_without_parameters() {
        let layout = HisLayout::new(FileType::Year, 0, 4).unwrap();
        assert_eq!(layout.data_offset(), 168 + 1 + 96);
        assert_eq!(layout.record_len(), 4);
    }

    #[test]
    fn test_time_step_count() {
        let layout = HisLayout::new(FileType::Month, 1, 2).unwrap();
        let offset = layout.data_offset() as u64;
        assert_eq!(layout.time_step_count(offset).unwrap(), 0);
        assert_eq!(layout.time_step_count(offset + 36).unwrap(), 3);
        assert!(matches!(
            layout.time_step_count(offset + 35),
            Err(HisError::TruncatedFile(_))
        ));
        assert!(matches!(
            layout.time_step_count(offset - 1),
            Err(HisError::TruncatedFile(_))
        ));
    }

    #[test]
    fn test_overflowing_counts() {
        assert!(matches!(
            HisLayout::new(FileType::Month, usize::MAX / 2, usize::MAX / 2),
            Err(HisError::MalformedHeader(_))
        ));
    }
}
