//! Time-step records and the value cube

use crate::his::error::{HisError, Result};
use crate::his::header::HisHeader;
use crate::his::options::TimestampOrder;
use binrw::{BinRead, BinWrite, Endian};
use chrono::NaiveDateTime;
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::{Index, IndexMut};
use tracing::{debug, trace, warn};

/// Dense `f32` cube indexed `[parameter, time step, location]`
///
/// Values are stored parameter-major, so all time steps and locations of
/// one parameter form a contiguous plane. Equality compares bit patterns,
/// which makes NaN values round-trip comparable.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesCube {
    parameters: usize,
    time_steps: usize,
    locations: usize,
    values: Vec<f32>,
}

impl TimeSeriesCube {
    /// Create a zero-filled cube with shape `(parameters, time_steps, locations)`
    pub fn zeros(shape: (usize, usize, usize)) -> Self {
        let (parameters, time_steps, locations) = shape;
        Self {
            parameters,
            time_steps,
            locations,
            values: vec![0.0; parameters * time_steps * locations],
        }
    }

    /// Wrap parameter-major values
    pub fn from_vec(shape: (usize, usize, usize), values: Vec<f32>) -> Result<Self> {
        let (parameters, time_steps, locations) = shape;
        let expected = parameters * time_steps * locations;
        if values.len() != expected {
            return Err(HisError::ShapeMismatch {
                what: "cube values",
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            parameters,
            time_steps,
            locations,
            values,
        })
    }

    /// `(parameters, time_steps, locations)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.parameters, self.time_steps, self.locations)
    }

    fn offset(&self, parameter: usize, time_step: usize, location: usize) -> Option<usize> {
        (parameter < self.parameters && time_step < self.time_steps && location < self.locations)
            .then(|| (parameter * self.time_steps + time_step) * self.locations + location)
    }

    /// Value at `[parameter, time_step, location]`
    pub fn get(&self, parameter: usize, time_step: usize, location: usize) -> Option<f32> {
        self.offset(parameter, time_step, location)
            .map(|offset| self.values[offset])
    }

    /// Overwrite one value; returns `false` when the index is out of range
    pub fn set(&mut self, parameter: usize, time_step: usize, location: usize, value: f32) -> bool {
        match self.offset(parameter, time_step, location) {
            Some(offset) => {
                self.values[offset] = value;
                true
            }
            None => false,
        }
    }

    /// All time steps and locations of one parameter, `[time_step][location]`
    pub fn parameter_plane(&self, parameter: usize) -> Option<&[f32]> {
        let plane = self.time_steps * self.locations;
        let start = parameter.checked_mul(plane)?;
        self.values.get(start..start + plane)
    }

    /// Time series of one parameter at one location
    pub fn series(&self, parameter: usize, location: usize) -> impl Iterator<Item = f32> + '_ {
        let valid = parameter < self.parameters && location < self.locations;
        (0..self.time_steps)
            .take_while(move |_| valid)
            .map(move |time_step| self[(parameter, time_step, location)])
    }

    /// Raw parameter-major values
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

impl Index<(usize, usize, usize)> for TimeSeriesCube {
    type Output = f32;

    #[allow(clippy::panic)] // Index contract
    fn index(&self, (parameter, time_step, location): (usize, usize, usize)) -> &f32 {
        let offset = self.offset(parameter, time_step, location);
        match offset {
            Some(offset) => &self.values[offset],
            None => panic!(
                "cube index [{parameter}, {time_step}, {location}] out of range for shape {:?}",
                self.shape()
            ),
        }
    }
}

impl IndexMut<(usize, usize, usize)> for TimeSeriesCube {
    #[allow(clippy::panic)] // Index contract
    fn index_mut(&mut self, (parameter, time_step, location): (usize, usize, usize)) -> &mut f32 {
        let shape = self.shape();
        match self.offset(parameter, time_step, location) {
            Some(offset) => &mut self.values[offset],
            None => panic!(
                "cube index [{parameter}, {time_step}, {location}] out of range for shape {shape:?}"
            ),
        }
    }
}

impl PartialEq for TimeSeriesCube {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for TimeSeriesCube {}

/// One time-step record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Stored tick offset
    pub tick: i32,
    /// `start + tick * step_seconds`
    pub timestamp: NaiveDateTime,
    /// Values in file order: location-major, parameter-minor
    pub values: Vec<f32>,
}

impl Record {
    /// Value of `parameter` at `location` given the parameter count
    pub fn value(&self, parameter: usize, location: usize, parameter_count: usize) -> Option<f32> {
        if parameter >= parameter_count {
            return None;
        }
        self.values.get(location * parameter_count + parameter).copied()
    }
}

/// Streaming reader over the time-step records of a HIS file
///
/// The number of records is derived from the stream length. Each record is
/// read on demand, so memory use stays bounded by one record.
pub struct RecordReader<R> {
    reader: R,
    header: HisHeader,
    values_per_record: usize,
    time_steps: usize,
    next_step: usize,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Start reading records; `reader` must be positioned at the first one
    pub fn new(mut reader: R, header: &HisHeader) -> Result<Self> {
        let layout = header.layout()?;
        let position = reader.stream_position()?;
        let total_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(position))?;

        let time_steps = layout.time_step_count(total_len)?;
        debug!(
            file_type = ?header.file_type,
            parameters = header.parameter_count,
            locations = header.location_count,
            time_steps,
            "HIS record stream"
        );

        Ok(Self {
            reader,
            header: header.clone(),
            values_per_record: layout.values_per_record(),
            time_steps,
            next_step: 0,
        })
    }

    /// Total number of records in the stream
    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    fn read_record(&mut self) -> Result<Record> {
        let step = self.next_step;
        let tick = i32::read_options(&mut self.reader, Endian::Little, ())?;
        let timestamp = self
            .header
            .timestamp(tick)
            .ok_or(HisError::TimestampOverflow { step })?;

        let mut values = Vec::with_capacity(self.values_per_record);
        for _ in 0..self.values_per_record {
            values.push(f32::read_options(&mut self.reader, Endian::Little, ())?);
        }

        trace!(step, tick, %timestamp, "read HIS record");
        Ok(Record {
            tick,
            timestamp,
            values,
        })
    }
}

impl<R: Read + Seek> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_step >= self.time_steps {
            return None;
        }
        let record = self.read_record();
        // Stop after the first error
        self.next_step = if record.is_ok() {
            self.next_step + 1
        } else {
            self.time_steps
        };
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.time_steps - self.next_step;
        (remaining, Some(remaining))
    }
}

/// Decode all records into timestamps and a cube
pub fn decode_series<R: Read + Seek>(
    reader: &mut R,
    header: &HisHeader,
    order: TimestampOrder,
) -> Result<(Vec<NaiveDateTime>, TimeSeriesCube)> {
    let records = RecordReader::new(reader, header)?;
    let (parameters, locations) = (header.parameter_count, header.location_count);
    let time_steps = records.time_steps();

    let mut timestamps = Vec::with_capacity(time_steps);
    let mut cube = TimeSeriesCube::zeros((parameters, time_steps, locations));

    for (time_step, record) in records.enumerate() {
        let record = record?;

        if let Some(&previous) = timestamps.last()
            && record.timestamp < previous
        {
            match order {
                TimestampOrder::Ignore => {}
                TimestampOrder::Warn => warn!(
                    step = time_step,
                    %previous,
                    timestamp = %record.timestamp,
                    "HIS timestamps are not monotonic"
                ),
                TimestampOrder::Reject => {
                    return Err(HisError::NonMonotonicTimestamps { step: time_step });
                }
            }
        }

        for (location, block) in record.values.chunks_exact(parameters.max(1)).enumerate() {
            for (parameter, &value) in block.iter().enumerate() {
                cube[(parameter, time_step, location)] = value;
            }
        }
        timestamps.push(record.timestamp);
    }

    Ok((timestamps, cube))
}

/// Encode all records; timestamps are converted back to rounded tick offsets
pub fn encode_series<W: Write + Seek>(
    writer: &mut W,
    header: &HisHeader,
    timestamps: &[NaiveDateTime],
    cube: &TimeSeriesCube,
) -> Result<()> {
    let expected = (header.parameter_count, timestamps.len(), header.location_count);
    if cube.shape() != expected {
        return Err(shape_mismatch(expected, cube.shape()));
    }
    let (parameters, _, locations) = expected;

    for (time_step, &timestamp) in timestamps.iter().enumerate() {
        let tick = header
            .tick(timestamp)
            .ok_or(HisError::TimestampOverflow { step: time_step })?;
        tick.write_options(writer, Endian::Little, ())?;

        for location in 0..locations {
            for parameter in 0..parameters {
                cube[(parameter, time_step, location)].write_options(writer, Endian::Little, ())?;
            }
        }
    }

    Ok(())
}

fn shape_mismatch(expected: (usize, usize, usize), actual: (usize, usize, usize)) -> HisError {
    let axes = [
        ("cube parameters", expected.0, actual.0),
        ("cube time steps", expected.1, actual.1),
        ("cube locations", expected.2, actual.2),
    ];
    let (what, expected, actual) = axes
        .into_iter()
        .find(|(_, e, a)| e != a)
        .unwrap_or(axes[0]);
    HisError::ShapeMismatch {
        what,
        expected,
        actual,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::his::layout::FileType;
    use binrw::io::Cursor;
    use chrono::{NaiveDate, TimeDelta};
    use pretty_assertions::assert_eq;

    fn header(parameters: usize, locations: usize) -> HisHeader {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut header = HisHeader::new("", start, 86400, FileType::Month).unwrap();
        header.parameter_count = parameters;
        header.location_count = locations;
        header
    }

    /// Records preceded by a dummy header/name region of the right length
    fn stream(header: &HisHeader, records: &[(i32, &[f32])]) -> Cursor<Vec<u8>> {
        let offset = header.layout().unwrap().data_offset();
        let mut data = vec![0u8; offset];
        for (tick, values) in records {
            data.extend_from_slice(&tick.to_le_bytes());
            for value in *values {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset as u64);
        cursor
    }

    #[test]
    fn test_timestamp_derivation() {
        let header = header(1, 1);
        let mut cursor = stream(&header, &[(0, &[1.0]), (1, &[2.0]), (2, &[3.0])]);
        let (timestamps, _) = decode_series(&mut cursor, &header, TimestampOrder::Warn).unwrap();

        let dates: Vec<String> = timestamps.iter().map(|t| t.date().to_string()).collect();
        assert_eq!(dates, vec!["2019-01-01", "2019-01-02", "2019-01-03"]);
    }

    #[test]
    fn test_location_major_values() {
        let header = header(1, 2);
        let mut cursor = stream(&header, &[(0, &[5.5, 6.5])]);
        let (_, cube) = decode_series(&mut cursor, &header, TimestampOrder::Warn).unwrap();

        assert_eq!(cube.shape(), (1, 1, 2));
        assert_eq!(cube[(0, 0, 0)], 5.5);
        assert_eq!(cube[(0, 0, 1)], 6.5);
    }

    #[test]
    fn test_parameter_minor_values() {
        // Location 0 holds [p0, p1], then location 1 holds [p0, p1]
        let header = header(2, 2);
        let mut cursor = stream(&header, &[(0, &[10.0, 11.0, 20.0, 21.0])]);
        let (_, cube) = decode_series(&mut cursor, &header, TimestampOrder::Warn).unwrap();

        assert_eq!(cube[(0, 0, 0)], 10.0);
        assert_eq!(cube[(1, 0, 0)], 11.0);
        assert_eq!(cube[(0, 0, 1)], 20.0);
        assert_eq!(cube[(1, 0, 1)], 21.0);
        assert_eq!(cube.parameter_plane(1), Some(&[11.0, 21.0][..]));
    }

    #[test]
    fn test_record_reader_streams() {
        let header = header(1, 2);
        let cursor = stream(&header, &[(0, &[1.0, 2.0]), (7, &[3.0, 4.0])]);
        let mut records = RecordReader::new(cursor, &header).unwrap();
        assert_eq!(records.size_hint(), (2, Some(2)));

        let first = records.next().unwrap().unwrap();
        assert_eq!(first.value(0, 1, 1), Some(2.0));
        let second = records.next().unwrap().unwrap();
        assert_eq!(second.tick, 7);
        assert_eq!(second.timestamp, header.start + TimeDelta::days(7));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_partial_record_is_truncation() {
        let header = header(2, 1);
        let mut cursor = stream(&header, &[(0, &[1.0, 2.0]), (1, &[3.0, 4.0])]);
        // Drop the last record and half of the one before
        let offset = header.layout().unwrap().data_offset();
        cursor.get_mut().truncate(offset + 12 + 6);
        assert!(matches!(
            decode_series(&mut cursor, &header, TimestampOrder::Warn),
            Err(HisError::TruncatedFile(_))
        ));
    }

    #[test]
    fn test_timestamp_order_policies() {
        let header = header(1, 1);
        let records: &[(i32, &[f32])] = &[(0, &[1.0]), (2, &[2.0]), (1, &[3.0])];

        let (timestamps, _) =
            decode_series(&mut stream(&header, records), &header, TimestampOrder::Warn).unwrap();
        assert_eq!(timestamps.len(), 3);

        assert!(
            decode_series(&mut stream(&header, records), &header, TimestampOrder::Ignore).is_ok()
        );
        assert!(matches!(
            decode_series(&mut stream(&header, records), &header, TimestampOrder::Reject),
            Err(HisError::NonMonotonicTimestamps { step: 2 })
        ));
    }

    #[test]
    fn test_encode_series_mirrors_decode() {
        let header = header(2, 3);
        let values: Vec<f32> = (0..12).map(|v| v as f32 * 0.5).collect();
        let cube = TimeSeriesCube::from_vec((2, 2, 3), values).unwrap();
        let timestamps = vec![header.start, header.start + TimeDelta::days(1)];

        let offset = header.layout().unwrap().data_offset();
        let mut cursor = Cursor::new(vec![0u8; offset]);
        cursor.set_position(offset as u64);
        encode_series(&mut cursor, &header, &timestamps, &cube).unwrap();
        assert_eq!(cursor.get_ref().len(), offset + 2 * (4 + 2 * 3 * 4));

        cursor.set_position(offset as u64);
        let (decoded_timestamps, decoded) =
            decode_series(&mut cursor, &header, TimestampOrder::Reject).unwrap();
        assert_eq!(decoded_timestamps, timestamps);
        assert_eq!(decoded, cube);
    }

    #[test]
    fn test_encode_shape_mismatch() {
        let header = header(2, 3);
        let cube = TimeSeriesCube::zeros((2, 1, 4));
        assert!(matches!(
            encode_series(&mut Cursor::new(Vec::new()), &header, &[header.start], &cube),
            Err(HisError::ShapeMismatch {
                what: "cube locations",
                expected: 3,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_cube_accessors() {
        let mut cube = TimeSeriesCube::zeros((2, 3, 2));
        assert!(cube.set(1, 2, 1, 9.0));
        assert!(!cube.set(2, 0, 0, 1.0));
        assert_eq!(cube.get(1, 2, 1), Some(9.0));
        assert_eq!(cube.get(0, 3, 0), None);
        assert_eq!(cube.series(1, 1).collect::<Vec<_>>(), vec![0.0, 0.0, 9.0]);
        assert_eq!(cube.series(5, 1).count(), 0);
        assert!(TimeSeriesCube::from_vec((2, 2, 2), vec![0.0; 7]).is_err());
    }

    #[test]
    fn test_cube_equality_is_bitwise() {
        let a = TimeSeriesCube::from_vec((1, 1, 2), vec![f32::NAN, -0.0]).unwrap();
        let b = TimeSeriesCube::from_vec((1, 1, 2), vec![f32::NAN, -0.0]).unwrap();
        let c = TimeSeriesCube::from_vec((1, 1, 2), vec![f32::NAN, 0.0]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
