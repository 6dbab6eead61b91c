//! Register time-series dataset
//!
//! Loads a CSV capture of PLC register values over time and exposes the
//! column-oriented views the classifier and the segmenter operate on.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Timestamp formats emitted by the capture tooling, tried in order.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// A time-indexed table of register values.
///
/// Rows keep the capture order; cells are kept as raw strings and
/// canonicalized on access so `1`, `1.0` and a numeric literal from the
/// invariant report all compare equal.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl Dataset {
    /// Load a dataset from a CSV file.
    ///
    /// Fails fast on a non-`.csv` extension, before touching the file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => {}
            _ => {
                return Err(Error::dataset(format!(
                    "invalid file format for {:?} (must be .csv)",
                    path
                )))
            }
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        tracing::debug!(
            "Loaded dataset {:?}: {} columns, {} rows",
            path,
            headers.len(),
            rows.len()
        );

        Ok(Self::from_parts(headers, rows))
    }

    /// Build a dataset from already-parsed headers and rows.
    pub fn from_parts(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Self {
            headers,
            rows,
            index,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::dataset(format!("missing column '{}'", name)))
    }

    /// Raw cell value at (row, column index)
    pub fn raw_value(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    /// Canonicalized cell value at (row, column index)
    pub fn value(&self, row: usize, col: usize) -> String {
        canon_value(&self.rows[row][col])
    }

    /// Canonicalized tuple of values at the given column indices
    pub fn tuple(&self, row: usize, cols: &[usize]) -> Vec<String> {
        cols.iter().map(|&c| self.value(row, c)).collect()
    }

    /// Number of distinct values a column takes across the whole series.
    ///
    /// Values are canonicalized first, so a register recorded as `7` in
    /// one capture and `7.0` in another still counts as constant.
    pub fn distinct_count(&self, name: &str) -> Result<usize> {
        let col = self.column_index(name)?;
        let values: HashSet<String> = self.rows.iter().map(|r| canon_value(&r[col])).collect();
        Ok(values.len())
    }

    /// Parse the timestamp cell at (row, column index)
    pub fn timestamp(&self, row: usize, col: usize) -> Result<NaiveDateTime> {
        parse_timestamp(&self.rows[row][col])
    }

    /// Write the table back out as CSV
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.headers)?;
        for row in &self.rows {
            out.write_record(row)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Parse a capture timestamp, accepting fractional and whole seconds.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    Err(Error::dataset(format!("unparsable timestamp '{}'", raw)))
}

/// Canonical rendering of a cell or numeric literal.
///
/// Numeric values are round-tripped through f64 so `1`, `1.0` and `01.00`
/// all render as `1`. Non-numeric values are returned verbatim.
pub fn canon_value(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) => fmt_level(v),
        Err(_) => raw.to_string(),
    }
}

/// Canonical rendering of a numeric actuator level
pub fn fmt_level(value: f64) -> String {
    format!("{}", value)
}
