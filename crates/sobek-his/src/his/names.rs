//! Parameter and location name tables

use crate::his::error::{HisError, Result};
use crate::his::layout::{HisLayout, NAME_WIDTH};
use crate::his::text::{decode_field, encode_field, normalize_key};
use binrw::{BinRead, BinWrite};
use std::io::{ErrorKind, Read, Seek, Write};

/// On-disk location record
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little)]
#[bw(little)]
struct LocationRecord {
    number: i32,
    name: [u8; NAME_WIDTH],
}

/// Ordered parameter names; the position is the cube's first index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterTable {
    names: Vec<String>,
}

impl ParameterTable {
    /// Create a table from names in cube order
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Iterate names in cube order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Find a parameter by name
    ///
    /// The key and every stored name are cut to 20 characters (19 in `Year`
    /// files) and trimmed before comparing, so full-length names resolve to
    /// their stored truncated form. The first match wins.
    pub fn position(&self, key: &str, layout: &HisLayout) -> Option<usize> {
        let width = layout.parameter_key_width();
        let key = normalize_key(key, width);
        self.names
            .iter()
            .position(|name| normalize_key(name, width) == key)
    }
}

/// One location entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Location number as stored; not necessarily contiguous
    pub number: i32,
    /// On-disk name, at most 20 bytes
    pub name: String,
    /// Full-length name from a HIA companion file, never written back
    pub long_name: Option<String>,
}

impl Location {
    /// Create a location without a long name
    pub fn new(number: i32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            long_name: None,
        }
    }

    /// Long name when one was merged in, otherwise the on-disk name
    pub fn display_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered locations; the position is the cube's third index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationTable {
    entries: Vec<Location>,
}

impl LocationTable {
    /// Create a table from entries in cube order
    pub fn new(entries: Vec<Location>) -> Self {
        Self { entries }
    }

    /// Create a table numbering the names from zero
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .zip(0..)
            .map(|(name, number)| Location::new(number, name))
            .collect();
        Self { entries }
    }

    /// Number of locations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&Location> {
        self.entries.get(index)
    }

    /// Iterate entries in cube order
    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.entries.iter()
    }

    /// Mutable access for merging long names
    pub(crate) fn entries_mut(&mut self) -> &mut [Location] {
        &mut self.entries
    }

    /// Display names in cube order
    pub fn display_names(&self) -> Vec<&str> {
        self.entries.iter().map(Location::display_name).collect()
    }

    /// Find a location by name
    ///
    /// The trimmed key is first matched against display names, which may
    /// be long names. Failing that it is cut to 20 characters, trimmed and
    /// matched against the on-disk names.
    pub fn position(&self, key: &str) -> Option<usize> {
        let exact = key.trim_end();
        self.entries
            .iter()
            .position(|location| location.display_name() == exact)
            .or_else(|| {
                let short = normalize_key(key, NAME_WIDTH);
                self.entries
                    .iter()
                    .position(|location| location.name == short)
            })
    }
}

/// Read one fixed-width field, treating a short read as truncation
fn read_field<R: Read>(reader: &mut R, width: usize) -> Result<Vec<u8>> {
    let mut field = vec![0u8; width];
    reader.read_exact(&mut field).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            HisError::TruncatedFile(format!("name table ends inside a {width} byte field"))
        } else {
            HisError::Io(e)
        }
    })?;
    Ok(field)
}

/// Decode both name tables; the reader must sit just past the header
pub fn decode_names<R: Read + Seek>(
    reader: &mut R,
    layout: &HisLayout,
) -> Result<(ParameterTable, LocationTable)> {
    // Counts are untrusted until the fields are read
    let mut names = Vec::new();
    for index in 0..layout.parameter_count() {
        let field = read_field(reader, layout.parameter_width(index))?;
        names.push(decode_field(&field));
    }

    let mut entries = Vec::new();
    for _ in 0..layout.location_count() {
        let record = LocationRecord::read(reader)?;
        entries.push(Location::new(record.number, decode_field(&record.name)));
    }

    Ok((ParameterTable::new(names), LocationTable::new(entries)))
}

/// Encode both name tables with the field widths of `layout`
///
/// Locations are written with their on-disk names; long names are dropped.
pub fn encode_names<W: Write + Seek>(
    writer: &mut W,
    layout: &HisLayout,
    parameters: &ParameterTable,
    locations: &LocationTable,
) -> Result<()> {
    if parameters.len() != layout.parameter_count() {
        return Err(HisError::ShapeMismatch {
            what: "parameter table",
            expected: layout.parameter_count(),
            actual: parameters.len(),
        });
    }
    if locations.len() != layout.location_count() {
        return Err(HisError::ShapeMismatch {
            what: "location table",
            expected: layout.location_count(),
            actual: locations.len(),
        });
    }

    for (index, name) in parameters.iter().enumerate() {
        writer.write_all(&encode_field(name, layout.parameter_width(index))?)?;
    }

    for location in locations.iter() {
        let mut name = [b' '; NAME_WIDTH];
        name.copy_from_slice(&encode_field(&location.name, NAME_WIDTH)?);
        LocationRecord {
            number: location.number,
            name,
        }
        .write(writer)?;
    }

    Ok(())
}
