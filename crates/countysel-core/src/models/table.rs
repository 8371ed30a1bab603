//! Tabular types: join keys, uploaded attribute tables, and export records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SelectorError};

/// Fixed leading columns of every export, in order.
pub const EXPORT_COLUMNS: [&str; 4] = ["STATE CODE", "COUNTY CODE", "FIPS", "COUNTY NAME"];

/// Shape of a fixed-width numeric identifier such as a county FIPS code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFormat {
    /// Total zero-padded width (5 for county FIPS)
    pub width: usize,
    /// Leading digits naming the enclosing region (2 for the state code)
    pub region_width: usize,
}

impl Default for KeyFormat {
    fn default() -> Self {
        Self::county_fips()
    }
}

impl KeyFormat {
    pub fn new(width: usize, region_width: usize) -> Self {
        Self { width, region_width: region_width.min(width) }
    }

    /// Five-digit county FIPS: two state digits, three county digits
    pub fn county_fips() -> Self {
        Self::new(5, 2)
    }

    /// Normalize a raw key to its zero-padded form.
    ///
    /// Accepts `6037`, `06037`, ` 06037 ` and float renderings of integers
    /// such as `6037.0`. Anything else, or a value wider than `width`, is a
    /// `KeyFormat` error.
    pub fn normalize(&self, raw: &str) -> Result<JoinKey> {
        let trimmed = raw.trim();
        let digits = match trimmed.split_once('.') {
            Some((int, frac)) if !frac.is_empty() && frac.bytes().all(|b| b == b'0') => int,
            Some(_) => {
                return Err(self.key_error(raw, "not an integer identifier"));
            }
            None => trimmed,
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.key_error(raw, "expected only digits"));
        }

        let significant = digits.trim_start_matches('0');
        if significant.len() > self.width {
            return Err(self.key_error(raw, &format!("wider than {} digits", self.width)));
        }

        Ok(JoinKey(format!("{:0>width$}", significant, width = self.width)))
    }

    /// Split a normalized key into its region and local parts.
    pub fn split<'a>(&self, key: &'a JoinKey) -> (&'a str, &'a str) {
        key.0.split_at(self.region_width.min(key.0.len()))
    }

    fn key_error(&self, raw: &str, reason: &str) -> SelectorError {
        SelectorError::KeyFormat { key: raw.to_string(), reason: reason.to_string() }
    }
}

/// A normalized, fixed-width identifier. Only [`KeyFormat`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JoinKey(String);

impl JoinKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row-oriented table uploaded by the user. Cells are kept as text.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl AttributeTable {
    /// Create a table, checking every row has one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len())
        {
            return Err(SelectorError::FormatError {
                format: "Table".to_string(),
                message: format!(
                    "row {} has {} cells, expected {}",
                    index + 1,
                    row.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
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

    /// Index of a column by exact (case-sensitive) name
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SelectorError::MissingColumn { column: name.to_string() })
    }
}

/// Final tabular projection offered for display and download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportRecord {
    /// An export with only the fixed columns and no rows
    pub fn empty() -> Self {
        Self { columns: EXPORT_COLUMNS.iter().map(|c| c.to_string()).collect(), rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// Render as CSV with a header row
    pub fn to_csv(&self) -> Result<String> {
        crate::formats::csv::export_to_csv(self)
    }
}
