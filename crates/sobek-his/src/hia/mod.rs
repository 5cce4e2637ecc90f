//! HIA companion file support
//!
//! A HIA file sits next to a HIS file and uses INI syntax. Its
//! `[Long Locations]` section maps 1-based location positions to names that
//! do not fit in the 20-byte HIS name field:
//!
//! ```text
//! [General]
//! Version = 1
//!
//! [Long Locations]
//! 1 = Reservoir Lake Victoria (outlet)
//! 4 = Public water supply district north
//! ```
//!
//! Other sections are syntax-checked and otherwise ignored. Long names are
//! view data: they are merged into a [`LocationTable`] during decode and never
//! written back into a HIS file.
//!
//! ```rust,no_run
//! use sobek_his::hia::{OverrideTable, companion_path};
//! use sobek_his::his::HisContainer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let his = HisContainer::open("case1/reservoir.his")?;
//! let overrides = OverrideTable::load(companion_path("case1/reservoir.his"))?;
//! let locations = overrides.apply(&his.locations);
//! println!("{:?}", locations.display_names());
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{HiaError, Result};

use crate::his::LocationTable;
use crate::his::text::decode_latin1;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the section holding long location names
pub const LONG_LOCATIONS_SECTION: &str = "Long Locations";

/// Section whose keys apply to every other section
const DEFAULT_SECTION: &str = "DEFAULT";

/// Path of the HIA file that accompanies a HIS file
pub fn companion_path(his_path: impl AsRef<Path>) -> PathBuf {
    his_path.as_ref().with_extension("hia")
}

/// Long location names keyed by 1-based position text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: BTreeMap<String, String>,
}

impl OverrideTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and parse a HIA file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HiaError::OverrideFileMissing(path.to_path_buf())
            } else {
                HiaError::Io(e)
            }
        })?;
        let text = String::from_utf8(bytes).unwrap_or_else(|e| decode_latin1(e.as_bytes()));

        let table = Self::parse(text.trim_start_matches('\u{feff}'))?;
        debug!(path = %path.display(), entries = table.len(), "loaded HIA long locations");
        Ok(table)
    }

    /// Parse HIA text
    ///
    /// Keys are trimmed and lower-cased, values trimmed. An indented line
    /// continues the previous value on a new line; blank lines between the
    /// value and its continuation are kept as empty lines. Keys set in a
    /// `[DEFAULT]` section fill in for keys `[Long Locations]` lacks.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries: BTreeMap<String, String> = BTreeMap::new();
        let mut defaults: BTreeMap<String, String> = BTreeMap::new();
        let mut sections = HashSet::new();
        let mut section: Option<String> = None;
        let mut section_keys = HashSet::new();
        let mut last_key: Option<String> = None;
        let mut blank_lines = 0usize;

        for (line_num, raw) in text.lines().enumerate() {
            let line_number = line_num + 1;
            let line = raw.trim();

            if line.is_empty() {
                if last_key.is_some() {
                    blank_lines += 1;
                }
                continue;
            }
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let target = match section.as_deref() {
                Some(LONG_LOCATIONS_SECTION) => Some(&mut entries),
                Some(DEFAULT_SECTION) => Some(&mut defaults),
                _ => None,
            };

            if raw.starts_with(char::is_whitespace)
                && let Some(key) = &last_key
            {
                if let Some(value) = target.and_then(|map| map.get_mut(key)) {
                    value.push_str(&"\n".repeat(blank_lines + 1));
                    value.push_str(line);
                }
                blank_lines = 0;
                continue;
            }
            blank_lines = 0;

            if line.len() > 2 && line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].to_string();
                if !sections.insert(name.clone()) {
                    return Err(parse_error(line_number, format!("duplicate section [{name}]")));
                }
                section = Some(name);
                section_keys.clear();
                last_key = None;
                continue;
            }

            if section.is_none() {
                return Err(parse_error(
                    line_number,
                    format!("{line:?} appears before the first section header"),
                ));
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err(parse_error(
                    line_number,
                    format!("missing '=' or ':' delimiter in {line:?}"),
                ));
            };
            let key = line[..split].trim().to_lowercase();
            let value = line[split + 1..].trim().to_string();

            if key.is_empty() {
                return Err(parse_error(line_number, format!("empty key in {line:?}")));
            }
            if !section_keys.insert(key.clone()) {
                return Err(parse_error(line_number, format!("duplicate key {key:?}")));
            }

            if let Some(map) = target {
                map.insert(key.clone(), value);
            }
            last_key = Some(key);
        }

        if sections.contains(LONG_LOCATIONS_SECTION) {
            for (key, value) in defaults {
                entries.entry(key).or_insert(value);
            }
        }

        Ok(Self { entries })
    }

    /// Number of long names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Long name for a 1-based position
    pub fn get(&self, position: usize) -> Option<&str> {
        self.entries.get(&position.to_string()).map(String::as_str)
    }

    /// Iterate `(key, long name)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attach long names to a copy of `locations`
    ///
    /// The entry at 1-based position `p` gets the long name stored under the
    /// key `p`; all others keep their on-disk name. Keys that name no
    /// location are ignored.
    pub fn apply(&self, locations: &LocationTable) -> LocationTable {
        let mut merged = locations.clone();
        let mut applied = 0usize;

        for (index, location) in merged.entries_mut().iter_mut().enumerate() {
            if let Some(long_name) = self.get(index + 1) {
                location.long_name = Some(long_name.to_string());
                applied += 1;
            }
        }

        if applied < self.entries.len() {
            for key in self.entries.keys() {
                let matches_position = key
                    .parse::<usize>()
                    .is_ok_and(|p| (1..=locations.len()).contains(&p) && p.to_string() == *key);
                if !matches_position {
                    warn!(key = %key, locations = locations.len(), "HIA long location key matches no HIS location");
                }
            }
        }

        debug!(applied, "merged long location names");
        merged
    }
}

impl FromIterator<(String, String)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn parse_error(line: usize, reason: String) -> HiaError {
    HiaError::OverrideParse { line, reason }
}
