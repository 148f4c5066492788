//! Identifier-source CSV reader.
//!
//! Layout: a header row (ignored), then one expert per row with the
//! identifier in the second column and an optional comma-separated list of
//! topic tags in the third.

use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use expertbase_shared::{ExpertBaseError, Result, split_list};

use crate::overrides::clean_cell;

/// Four groups of four digits; the final character may be the `X` checksum.
static ORCID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").expect("valid regex")
});

/// One row of the identifier source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub identifier: String,
    pub topic_tags: Vec<String>,
}

pub fn is_valid_identifier(identifier: &str) -> bool {
    ORCID_RE.is_match(identifier)
}

/// Read the identifier CSV at `path`. A missing file is an error.
#[instrument]
pub fn read_identifier_csv(path: &Path) -> Result<Vec<SourceEntry>> {
    let file = std::fs::File::open(path).map_err(|e| ExpertBaseError::io(path, e))?;
    parse_identifiers(file).map_err(|e| ExpertBaseError::csv(path, e))
}

/// Parse identifier rows, skipping (with a warning) rows without a well-formed identifier.
pub fn parse_identifiers<R: Read>(reader: R) -> std::result::Result<Vec<SourceEntry>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = index + 2;

        let Some(raw) = record.get(1) else {
            warn!(line, "identifier row has no second column, skipping");
            continue;
        };
        let identifier = clean_cell(raw);
        if !is_valid_identifier(identifier) {
            warn!(line, identifier, "malformed identifier, skipping");
            continue;
        }

        let topic_tags = record.get(2).map(split_list).unwrap_or_default();
        debug!(identifier, tags = topic_tags.len(), "identifier row");
        entries.push(SourceEntry {
            identifier: identifier.to_string(),
            topic_tags,
        });
    }
    Ok(entries)
}
