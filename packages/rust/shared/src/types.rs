//! Core record types for the expert base.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// The persisted form of the expert base: identifier → field dictionary.
///
/// Records keep their import order, in memory and in the JSON file.
pub type RawStore = IndexMap<String, ExpertRecord>;

// ---------------------------------------------------------------------------
// Employment
// ---------------------------------------------------------------------------

/// One current employment: role, department and organization.
///
/// Serialized as a three-element array `[role, department, organization]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[String; 3]", into = "[String; 3]")]
pub struct Employment {
    pub role_title: String,
    pub department_name: String,
    pub organization_name: String,
}

impl Employment {
    pub fn new(
        role_title: impl Into<String>,
        department_name: impl Into<String>,
        organization_name: impl Into<String>,
    ) -> Self {
        Self {
            role_title: role_title.into(),
            department_name: department_name.into(),
            organization_name: organization_name.into(),
        }
    }

    /// Parse an override cell: entries separated by `;`, parts by `|`.
    ///
    /// `Researcher|Digital Humanities|Uni Hamburg; Lecturer||FU Berlin`
    pub fn parse_cell(cell: &str) -> Vec<Self> {
        cell.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let mut parts = entry.splitn(3, '|').map(|p| p.trim().to_string());
                Self {
                    role_title: parts.next().unwrap_or_default(),
                    department_name: parts.next().unwrap_or_default(),
                    organization_name: parts.next().unwrap_or_default(),
                }
            })
            .collect()
    }

    /// The non-empty parts joined with `", "`.
    pub fn display_line(&self) -> String {
        [
            self.role_title.as_str(),
            self.department_name.as_str(),
            self.organization_name.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl From<[String; 3]> for Employment {
    fn from([role_title, department_name, organization_name]: [String; 3]) -> Self {
        Self {
            role_title,
            department_name,
            organization_name,
        }
    }
}

impl From<Employment> for [String; 3] {
    fn from(e: Employment) -> Self {
        [e.role_title, e.department_name, e.organization_name]
    }
}

// ---------------------------------------------------------------------------
// ExpertRecord
// ---------------------------------------------------------------------------

/// The field dictionary of one expert, keyed in the store by its identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertRecord {
    pub given_name: String,
    pub family_name: String,
    pub current_employments: Vec<Employment>,
    pub research_interests: Vec<String>,
    pub email: String,
    pub topic_tags: Vec<String>,
    /// Fields introduced by override imports.
    ///
    /// Numbers and booleans in a stored file are read back as text; nulls,
    /// arrays and objects are dropped with a warning.
    #[serde(flatten, deserialize_with = "lenient_extra")]
    pub extra: BTreeMap<String, String>,
}

impl ExpertRecord {
    /// Set or overwrite one field from a raw text value.
    ///
    /// List fields are split on commas; employments use the
    /// [`Employment::parse_cell`] format. A value that is blank, or a list
    /// with no entries left after splitting, leaves the record untouched and
    /// returns `false`.
    pub fn set(&mut self, field: &RecordField, value: &str) -> bool {
        if value.trim().is_empty() {
            return false;
        }
        match field {
            RecordField::GivenName => self.given_name = value.to_string(),
            RecordField::FamilyName => self.family_name = value.to_string(),
            RecordField::Email => self.email = value.to_string(),
            RecordField::ResearchInterests => {
                return replace_if_any(&mut self.research_interests, split_list(value));
            }
            RecordField::TopicTags => {
                return replace_if_any(&mut self.topic_tags, split_list(value));
            }
            RecordField::CurrentEmployments => {
                return replace_if_any(&mut self.current_employments, Employment::parse_cell(value));
            }
            RecordField::Extra(name) => {
                self.extra.insert(name.clone(), value.to_string());
            }
        }
        true
    }
}

fn replace_if_any<T>(slot: &mut Vec<T>, items: Vec<T>) -> bool {
    if items.is_empty() {
        return false;
    }
    *slot = items;
    true
}

fn lenient_extra<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    let mut extra = BTreeMap::new();
    for (key, value) in raw {
        match value {
            serde_json::Value::String(s) => {
                extra.insert(key, s);
            }
            serde_json::Value::Number(n) => {
                extra.insert(key, n.to_string());
            }
            serde_json::Value::Bool(b) => {
                extra.insert(key, b.to_string());
            }
            other => warn!(field = %key, value = %other, "dropping non-scalar stored field"),
        }
    }
    Ok(extra)
}

// ---------------------------------------------------------------------------
// RecordField
// ---------------------------------------------------------------------------

/// A field name as it appears in store JSON and override CSV headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordField {
    GivenName,
    FamilyName,
    CurrentEmployments,
    ResearchInterests,
    Email,
    TopicTags,
    /// Any other name, kept verbatim (trimmed).
    Extra(String),
}

impl RecordField {
    /// Resolve a header name. Matching is case-insensitive and treats
    /// `-` and spaces like `_`.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        let normalized = trimmed.to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "given_name" => Self::GivenName,
            "family_name" => Self::FamilyName,
            "current_employments" => Self::CurrentEmployments,
            "research_interests" => Self::ResearchInterests,
            "email" | "e_mail" => Self::Email,
            "topic_tags" => Self::TopicTags,
            _ => Self::Extra(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::GivenName => "given_name",
            Self::FamilyName => "family_name",
            Self::CurrentEmployments => "current_employments",
            Self::ResearchInterests => "research_interests",
            Self::Email => "email",
            Self::TopicTags => "topic_tags",
            Self::Extra(name) => name,
        }
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
