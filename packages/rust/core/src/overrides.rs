//! Override tables: CSV rows that extend or overwrite record fields.
//!
//! The first header cell is the identifier marker (`orcid`); every further
//! header cell names a field. Data rows carry the identifier in column one.

use std::io::Read;
use std::path::Path;

use expertbase_shared::{ExpertBaseError, RecordField, Result};

/// Header value that marks the identifier column.
pub const IDENTIFIER_MARKER: &str = "orcid";

/// A parsed override CSV, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OverrideTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Read a table from a CSV file. Rows may have differing lengths.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ExpertBaseError::io(path, e))?;
        Self::from_reader(file).map_err(|e| ExpertBaseError::csv(path, e))
    }

    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record?.iter().map(String::from).collect(),
            None => Vec::new(),
        };
        let rows: Vec<Vec<String>> = records
            .map(|r| r.map(|record| record.iter().map(String::from).collect()))
            .collect::<std::result::Result<_, _>>()?;

        Ok(Self { header, rows })
    }

    /// Structural check of the header; returns the field for every column after the first.
    pub fn validate(&self) -> std::result::Result<Vec<RecordField>, String> {
        if self.header.len() < 2 {
            return Err(format!(
                "override table needs at least 2 columns, found {}",
                self.header.len()
            ));
        }

        let marker = clean_cell(&self.header[0]);
        if !marker.eq_ignore_ascii_case(IDENTIFIER_MARKER) {
            return Err(format!(
                "first header column must be '{IDENTIFIER_MARKER}', found '{marker}'"
            ));
        }

        Ok(self.header[1..].iter().map(|h| RecordField::parse(h)).collect())
    }
}

/// Strip a leading byte-order mark and surrounding whitespace.
pub fn clean_cell(cell: &str) -> &str {
    cell.trim_start_matches('\u{feff}').trim()
}

/// Result of applying a validated table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Number of (record, field) assignments made.
    pub fields_set: usize,
    /// Identifiers from the table that are not in the base.
    pub unknown_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied(MergeReport),
    /// The header failed validation; nothing was changed.
    Rejected { reason: String },
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
