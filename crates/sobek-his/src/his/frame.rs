//! Selected time series of one parameter

use chrono::{NaiveDate, NaiveDateTime};

/// Values of one parameter at a set of locations over all time steps
///
/// `rows[t][c]` is the value at `timestamps[t]` for `columns[c]`. Columns keep
/// the order and spelling the caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFrame {
    /// Parameter name as stored in the file
    pub parameter: String,
    /// Column labels
    pub columns: Vec<String>,
    /// One timestamp per row
    pub timestamps: Vec<NaiveDateTime>,
    /// One row per time step, one value per column
    pub rows: Vec<Vec<f32>>,
}

impl SeriesFrame {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Timestamps with the time of day dropped
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.timestamps.iter().map(NaiveDateTime::date).collect()
    }

    /// Values of the column labelled `label`
    ///
    /// `None` when no column has that label or a row is too short to hold it.
    pub fn column(&self, label: &str) -> Option<Vec<f32>> {
        let index = self.columns.iter().position(|c| c == label)?;
        self.rows.iter().map(|row| row.get(index).copied()).collect()
    }
}
