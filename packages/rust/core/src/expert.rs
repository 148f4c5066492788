//! One expert: an identifier plus its record, with display accessors.

use expertbase_lookup::EntityLookup;
use expertbase_shared::{Employment, ExpertRecord};
use tracing::debug;

/// Prefix for the public profile link of an identifier.
pub const PROFILE_URL_PREFIX: &str = "https://orcid.org/";

/// An expert as handed out by [`crate::ExpertBase::list`].
///
/// Owns a snapshot of the record; mutating it does not touch the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expert {
    identifier: String,
    record: ExpertRecord,
}

impl Expert {
    pub fn new(identifier: impl Into<String>, record: ExpertRecord) -> Self {
        Self {
            identifier: identifier.into(),
            record,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn record(&self) -> &ExpertRecord {
        &self.record
    }

    /// `https://orcid.org/{identifier}`.
    pub fn profile_url(&self) -> String {
        format!("{PROFILE_URL_PREFIX}{}", self.identifier)
    }

    /// "First Last".
    pub fn name(&self) -> String {
        format!("{} {}", self.record.given_name, self.record.family_name)
    }

    pub fn name_parts(&self) -> (&str, &str) {
        (&self.record.given_name, &self.record.family_name)
    }

    pub fn email(&self) -> &str {
        &self.record.email
    }

    /// The first `n` current employments.
    pub fn current_employment(&self, n: usize) -> &[Employment] {
        let employments = &self.record.current_employments;
        &employments[..n.min(employments.len())]
    }

    /// The first `n` employments as a Markdown bullet list.
    pub fn formatted_employment(&self, n: usize) -> String {
        self.current_employment(n)
            .iter()
            .map(|e| format!("* {}", e.display_line()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn research_interests(&self) -> &[String] {
        &self.record.research_interests
    }

    /// Research interests normalized for listing filters.
    ///
    /// A single comma-joined entry is split first. Entries that start with a
    /// non-alphanumeric character lose `(`, `)` and `#`. Every entry is
    /// title-cased; the result is joined with `;`.
    pub fn formatted_research_interests(&self) -> String {
        keyword_list(&self.record.research_interests)
            .iter()
            .map(|k| title_case(&strip_markup(k)))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Research interests with a single comma-joined entry split up, otherwise untouched.
    pub fn keyword_list(&self) -> Vec<String> {
        keyword_list(&self.record.research_interests)
    }

    pub fn topic_tags(&self) -> &[String] {
        &self.record.topic_tags
    }

    pub fn topic_tag_list(&self) -> Vec<String> {
        keyword_list(&self.record.topic_tags)
    }

    pub fn formatted_topic_tags(&self) -> String {
        self.record.topic_tags.join(";")
    }

    /// `given-family`, lower-cased with inner spaces hyphenated.
    pub fn slug(&self) -> String {
        format!(
            "{}-{}",
            slug_part(&self.record.given_name),
            slug_part(&self.record.family_name)
        )
    }

    /// Distinct current organizations, deduplicated by lookup key.
    ///
    /// Names are collected in employment order, each is resolved once, and
    /// the first name seen for a key wins. An unresolved name is keyed by
    /// itself, so two unresolved spellings of one organization both survive.
    pub async fn organisations<L: EntityLookup>(&self, lookup: &L) -> Vec<String> {
        let mut names: Vec<&str> = Vec::new();
        for employment in &self.record.current_employments {
            let name = employment.organization_name.as_str();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }

        let mut keys: Vec<String> = Vec::new();
        let mut kept = Vec::new();
        for name in names {
            let result = lookup.resolve(name).await;
            let key = result.key().to_string();
            if keys.contains(&key) {
                debug!(organisation = name, key, "dropping duplicate organisation");
                continue;
            }
            keys.push(key);
            kept.push(name.to_string());
        }
        kept
    }
}

fn keyword_list(entries: &[String]) -> Vec<String> {
    let split: Vec<String> = match entries {
        [single] if single.contains(',') => single.split(',').map(|k| k.trim().to_string()).collect(),
        _ => entries.to_vec(),
    };
    split.into_iter().filter(|k| !k.is_empty()).collect()
}

fn strip_markup(keyword: &str) -> String {
    match keyword.chars().next() {
        Some(first) if !first.is_alphanumeric() => keyword.replace(['(', ')', '#'], ""),
        _ => keyword.to_string(),
    }
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphabetic();
    }
    out
}

fn slug_part(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "-")
}
