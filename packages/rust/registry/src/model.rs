//! Registry response shapes and biographical field extraction.
//!
//! Only the parts of the ORCID v3.0 `person` and `activities` documents the
//! expert base reads are modelled. Every level is optional: private or
//! incomplete profiles return `null` for whole blocks.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// A `{"value": "..."}` wrapper as used for names and date parts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValueField {
    pub value: Option<String>,
}

impl ValueField {
    fn text(field: &Option<ValueField>) -> String {
        field
            .as_ref()
            .and_then(|f| f.value.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// /person
// ---------------------------------------------------------------------------

/// Response body of the `person` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonResponse {
    pub name: Option<NameBlock>,
    pub emails: Option<EmailsBlock>,
    pub keywords: Option<KeywordsBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NameBlock {
    #[serde(rename = "given-names")]
    pub given_names: Option<ValueField>,
    #[serde(rename = "family-name")]
    pub family_name: Option<ValueField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailsBlock {
    pub email: Option<Vec<EmailEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailEntry {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeywordsBlock {
    pub keyword: Option<Vec<KeywordEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeywordEntry {
    pub content: Option<String>,
}

/// Biographical fields extracted from a `person` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Biography {
    pub given_name: String,
    pub family_name: String,
    /// First listed email address, or empty.
    pub email: String,
    /// Keyword contents in registry order.
    pub keywords: Vec<String>,
}

impl From<&PersonResponse> for Biography {
    fn from(person: &PersonResponse) -> Self {
        let (given_name, family_name) = match &person.name {
            Some(name) => (
                ValueField::text(&name.given_names),
                ValueField::text(&name.family_name),
            ),
            None => (String::new(), String::new()),
        };

        let email = person
            .emails
            .as_ref()
            .and_then(|e| e.email.as_ref())
            .and_then(|list| list.first())
            .and_then(|entry| entry.email.clone())
            .unwrap_or_default();

        let keywords = person
            .keywords
            .as_ref()
            .and_then(|k| k.keyword.as_ref())
            .map(|list| list.iter().filter_map(|k| k.content.clone()).collect())
            .unwrap_or_default();

        Self {
            given_name,
            family_name,
            email,
            keywords,
        }
    }
}

// ---------------------------------------------------------------------------
// /activities
// ---------------------------------------------------------------------------

/// Response body of the `activities` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivitiesResponse {
    pub employments: Option<EmploymentsBlock>,
}

impl ActivitiesResponse {
    /// The affiliation groups, or an empty slice.
    pub fn affiliation_groups(&self) -> &[AffiliationGroup] {
        self.employments
            .as_ref()
            .and_then(|e| e.affiliation_group.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmploymentsBlock {
    #[serde(rename = "affiliation-group")]
    pub affiliation_group: Option<Vec<AffiliationGroup>>,
}

/// Employment summaries sharing one context; the first one is authoritative.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AffiliationGroup {
    pub summaries: Option<Vec<SummaryEnvelope>>,
}

impl AffiliationGroup {
    /// The first summary of the group, if any.
    pub fn authoritative(&self) -> Option<&EmploymentSummary> {
        self.summaries
            .as_ref()
            .and_then(|s| s.first())
            .and_then(|s| s.employment_summary.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummaryEnvelope {
    #[serde(rename = "employment-summary")]
    pub employment_summary: Option<EmploymentSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmploymentSummary {
    #[serde(rename = "role-title")]
    pub role_title: Option<String>,
    #[serde(rename = "department-name")]
    pub department_name: Option<String>,
    pub organization: Option<Organization>,
    #[serde(rename = "end-date")]
    pub end_date: Option<FuzzyDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub name: Option<String>,
}

/// A registry date where every part may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FuzzyDate {
    pub year: Option<ValueField>,
    pub month: Option<ValueField>,
    pub day: Option<ValueField>,
}

impl FuzzyDate {
    pub fn year(&self) -> Option<i32> {
        parse_part(&self.year)
    }

    pub fn month(&self) -> Option<u32> {
        parse_part(&self.month)
    }

    pub fn day(&self) -> Option<u32> {
        parse_part(&self.day)
    }
}

fn parse_part<T: std::str::FromStr>(field: &Option<ValueField>) -> Option<T> {
    field
        .as_ref()
        .and_then(|f| f.value.as_deref())
        .and_then(|v| v.trim().parse().ok())
}
