//! Quarto listing file: one YAML mapping per expert.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use expertbase_lookup::EntityLookup;
use expertbase_shared::{ExpertBaseError, Result};

use crate::expert::Expert;

/// Separator between organisations in one listing cell.
pub const ORGANISATION_SEPARATOR: &str = ",<br>";

/// One listing row. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Display name linked to the detail page.
    pub name: String,
    pub sort_key: String,
    pub organisation: String,
    pub keywords: String,
    pub topics: String,
    pub page: String,
}

/// Relative path of an expert's rendered page.
pub fn page_path(expert: &Expert) -> String {
    format!("experts/{}.html", expert.slug())
}

pub async fn listing_entry<L: EntityLookup>(expert: &Expert, lookup: &L) -> ListingEntry {
    let page = page_path(expert);
    ListingEntry {
        name: format!("<a href={page}>{}</a>", expert.name()),
        sort_key: expert.record().family_name.clone(),
        organisation: expert.organisations(lookup).await.join(ORGANISATION_SEPARATOR),
        keywords: expert.formatted_research_interests(),
        topics: expert.formatted_topic_tags(),
        page,
    }
}

/// Build entries in the order given, resolving organisations one expert at a time.
pub async fn build_listing<L: EntityLookup>(experts: &[Expert], lookup: &L) -> Vec<ListingEntry> {
    let mut entries = Vec::with_capacity(experts.len());
    for expert in experts {
        entries.push(listing_entry(expert, lookup).await);
    }
    entries
}

pub fn to_yaml(entries: &[ListingEntry]) -> Result<String> {
    serde_yaml::to_string(entries).map_err(|e| ExpertBaseError::Serialization(e.to_string()))
}

/// Write `{dir}/{file}`, creating `dir` if needed.
#[instrument(skip(entries), fields(entries = entries.len()))]
pub fn write_listing(entries: &[ListingEntry], dir: &Path, file: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| ExpertBaseError::io(dir, e))?;
    let path = dir.join(file);
    std::fs::write(&path, to_yaml(entries)?).map_err(|e| ExpertBaseError::io(&path, e))?;
    info!(path = %path.display(), "wrote listing");
    Ok(path)
}
