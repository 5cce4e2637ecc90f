//! HIS container: whole-file decode and encode

use crate::hia::OverrideTable;
use crate::his::error::{HisError, Result};
use crate::his::frame::SeriesFrame;
use crate::his::header::{HisHeader, decode_header, encode_header};
use crate::his::layout::FileType;
use crate::his::names::{Location, LocationTable, ParameterTable, decode_names, encode_names};
use crate::his::options::DecodeOptions;
use crate::his::series::{TimeSeriesCube, decode_series, encode_series};
use chrono::NaiveDateTime;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

/// Complete HIS file: header, name tables, timestamps and value cube
///
/// The cube is indexed `[parameter, time step, location]` using the order of
/// `parameters`, `timestamps` and `locations`. A container is either produced
/// whole by one of the decode functions or assembled by the caller (see
/// [`HisContainerBuilder`]) and then encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HisContainer {
    /// File header
    pub header: HisHeader,
    /// Parameter names in cube order
    pub parameters: ParameterTable,
    /// Locations in cube order
    pub locations: LocationTable,
    /// One timestamp per time step
    pub timestamps: Vec<NaiveDateTime>,
    /// Values
    pub cube: TimeSeriesCube,
}

impl HisContainer {
    /// Decode a HIS file held in memory
    ///
    /// # Errors
    /// Returns error if:
    /// - The time-info block cannot be parsed
    /// - The data ends early or holds a partial record
    /// - A tick offset overflows the timestamp range
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with_options(data, &DecodeOptions::default())
    }

    /// Decode and merge long location names from a HIA file
    pub fn decode_with_overrides(data: &[u8], overrides: impl AsRef<Path>) -> Result<Self> {
        let options = DecodeOptions::new().with_long_locations(overrides.as_ref());
        Self::decode_with_options(data, &options)
    }

    /// Decode with explicit options
    pub fn decode_with_options(data: &[u8], options: &DecodeOptions) -> Result<Self> {
        Self::read_from(&mut Cursor::new(data), options)
    }

    /// Decode from a seekable reader positioned at the start of a HIS file
    ///
    /// The reader's total length determines the number of time steps, so it
    /// must end where the HIS data ends.
    pub fn read_from<R: Read + Seek>(reader: &mut R, options: &DecodeOptions) -> Result<Self> {
        let header = decode_header(reader)?;
        let layout = header.layout()?;
        debug!(
            title = %header.title_text(),
            start = %header.start,
            step_seconds = header.step_seconds,
            file_type = ?header.file_type,
            "decoded HIS header"
        );

        let (parameters, mut locations) = decode_names(reader, &layout)?;
        if let Some(path) = &options.long_locations {
            locations = OverrideTable::load(path)?.apply(&locations);
        }

        let (timestamps, cube) = decode_series(reader, &header, options.timestamp_order)?;

        Ok(Self {
            header,
            parameters,
            locations,
            timestamps,
            cube,
        })
    }

    /// Read and decode a HIS file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, &DecodeOptions::default())
    }

    /// Read a HIS file and merge long location names from a HIA file
    pub fn open_with_overrides(path: impl AsRef<Path>, overrides: impl AsRef<Path>) -> Result<Self> {
        let options = DecodeOptions::new().with_long_locations(overrides.as_ref());
        Self::open_with_options(path, &options)
    }

    /// Read and decode a HIS file with explicit options
    pub fn open_with_options(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), bytes = data.len(), "read HIS file");
        Self::decode_with_options(&data, options)
    }

    /// Encode to bytes
    ///
    /// Long location names are not written; the on-disk names are.
    ///
    /// # Errors
    /// Returns error if:
    /// - Header counts, tables, timestamps and cube disagree
    /// - The step unit does not fit the time-info block
    /// - Text holds characters outside ISO-8859-1
    /// - A timestamp is too far from the start to store as a tick offset
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let layout = self.header.layout()?;

        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        encode_header(&mut cursor, &self.header)?;
        encode_names(&mut cursor, &layout, &self.parameters, &self.locations)?;
        encode_series(&mut cursor, &self.header, &self.timestamps, &self.cube)?;

        let actual = buffer.len();
        let expected = layout.expected_len(self.timestamps.len()).ok_or_else(|| {
            HisError::MalformedHeader(format!(
                "{} time steps overflow the addressable size",
                self.timestamps.len()
            ))
        })?;
        if actual != expected {
            return Err(HisError::SizeMismatch { expected, actual });
        }

        debug!(bytes = actual, time_steps = self.timestamps.len(), "encoded HIS file");
        Ok(buffer)
    }

    /// Encode and write to `path`
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = self.encode()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Check that header counts, tables, timestamps and cube agree
    pub fn validate(&self) -> Result<()> {
        let (parameters, time_steps, locations) = self.cube.shape();
        ensure_len("header parameter count", self.parameters.len(), self.header.parameter_count)?;
        ensure_len("header location count", self.locations.len(), self.header.location_count)?;
        ensure_len("cube parameters", self.parameters.len(), parameters)?;
        ensure_len("cube time steps", self.timestamps.len(), time_steps)?;
        ensure_len("cube locations", self.locations.len(), locations)
    }

    /// `(parameters, time_steps, locations)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.cube.shape()
    }

    /// Attach long location names after decoding
    pub fn apply_overrides(&mut self, overrides: &OverrideTable) {
        self.locations = overrides.apply(&self.locations);
    }

    /// Cube index of a parameter
    ///
    /// The name is cut to the stored field width and trimmed first.
    pub fn parameter_index(&self, name: &str) -> Result<usize> {
        let layout = self.header.layout()?;
        self.parameters
            .position(name, &layout)
            .ok_or_else(|| HisError::ParameterNotFound(name.to_string()))
    }

    /// Cube index of a location, by long or on-disk name
    pub fn location_index(&self, name: &str) -> Result<usize> {
        self.locations
            .position(name)
            .ok_or_else(|| HisError::LocationNotFound(name.to_string()))
    }

    /// Time series of one parameter at one location
    pub fn series(&self, parameter: &str, location: &str) -> Result<Vec<f32>> {
        let parameter = self.parameter_index(parameter)?;
        let location = self.location_index(location)?;
        Ok(self.cube.series(parameter, location).collect())
    }

    /// Values of one parameter at the given locations over all time steps
    ///
    /// Columns follow the order of `locations` and keep the caller's labels.
    /// Any unknown name fails the whole selection.
    pub fn select<S: AsRef<str>>(&self, parameter: &str, locations: &[S]) -> Result<SeriesFrame> {
        self.validate()?;
        let parameter_index = self.parameter_index(parameter)?;
        let columns = locations
            .iter()
            .map(|name| self.location_index(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let rows = (0..self.timestamps.len())
            .map(|time_step| {
                columns
                    .iter()
                    .map(|&location| self.cube[(parameter_index, time_step, location)])
                    .collect()
            })
            .collect();

        Ok(SeriesFrame {
            parameter: self
                .parameters
                .get(parameter_index)
                .unwrap_or(parameter)
                .to_string(),
            columns: locations.iter().map(|l| l.as_ref().to_string()).collect(),
            timestamps: self.timestamps.clone(),
            rows,
        })
    }
}

fn ensure_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(HisError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}

impl crate::BinaryFormat for HisContainer {
    fn parse(data: &[u8]) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        Self::decode(data).map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.encode()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}

/// Builder for assembling a container from scratch
///
/// Header counts are taken from the tables, and a zero cube of the right
/// shape is used when no values are given.
///
/// ```rust
/// use chrono::NaiveDate;
/// use sobek_his::his::{FileType, HisContainer, HisContainerBuilder};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let start = NaiveDate::from_ymd_opt(2019, 1, 1)
///     .and_then(|d| d.and_hms_opt(0, 0, 0))
///     .ok_or("bad date")?;
/// let his = HisContainerBuilder::new(start, 86400)
///     .title("Case 1")
///     .file_type(FileType::Month)
///     .add_parameter("Storage")
///     .add_location(1, "Reservoir")
///     .add_time_step(start)
///     .build()?;
///
/// let bytes = his.encode()?;
/// assert_eq!(HisContainer::decode(&bytes)?, his);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HisContainerBuilder {
    title: String,
    start: NaiveDateTime,
    step_seconds: i32,
    file_type: FileType,
    parameters: Vec<String>,
    locations: Vec<Location>,
    timestamps: Vec<NaiveDateTime>,
    cube: Option<TimeSeriesCube>,
}

impl HisContainerBuilder {
    /// Start a `Month` container with an empty title
    pub fn new(start: NaiveDateTime, step_seconds: i32) -> Self {
        Self {
            title: String::new(),
            start,
            step_seconds,
            file_type: FileType::Month,
            parameters: Vec::new(),
            locations: Vec::new(),
            timestamps: Vec::new(),
            cube: None,
        }
    }

    /// Free-text title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Layout variant
    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.file_type = file_type;
        self
    }

    /// Append a parameter
    pub fn add_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    /// Append a location
    pub fn add_location(mut self, number: i32, name: impl Into<String>) -> Self {
        self.locations.push(Location::new(number, name));
        self
    }

    /// Append a time step
    pub fn add_time_step(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamps.push(timestamp);
        self
    }

    /// Append one time step per tick offset from the start
    pub fn add_ticks(mut self, ticks: impl IntoIterator<Item = i32>) -> Result<Self> {
        let header = HisHeader::new("", self.start, self.step_seconds, self.file_type)?;
        for tick in ticks {
            let step = self.timestamps.len();
            let timestamp = header
                .timestamp(tick)
                .ok_or(HisError::TimestampOverflow { step })?;
            self.timestamps.push(timestamp);
        }
        Ok(self)
    }

    /// Values indexed `[parameter, time step, location]`
    pub fn values(mut self, cube: TimeSeriesCube) -> Self {
        self.cube = Some(cube);
        self
    }

    /// Build and validate the container
    pub fn build(self) -> Result<HisContainer> {
        let mut header = HisHeader::new(&self.title, self.start, self.step_seconds, self.file_type)?;
        header.parameter_count = self.parameters.len();
        header.location_count = self.locations.len();
        header.layout()?;

        let shape = (
            self.parameters.len(),
            self.timestamps.len(),
            self.locations.len(),
        );
        let container = HisContainer {
            header,
            parameters: ParameterTable::new(self.parameters),
            locations: LocationTable::new(self.locations),
            timestamps: self.timestamps,
            cube: self.cube.unwrap_or_else(|| TimeSeriesCube::zeros(shape)),
        };
        container.validate()?;
        Ok(container)
    }
}
