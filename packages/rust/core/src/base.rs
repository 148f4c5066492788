//! The expert base: every known record, keyed by identifier.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info, instrument, warn};

use expertbase_registry::Biography;
use expertbase_shared::{Employment, ExpertBaseError, ExpertRecord, RawStore, Result};

use crate::expert::Expert;
use crate::overrides::{MergeOutcome, MergeReport, OverrideTable, clean_cell};

/// Records keyed by identifier, in import order. Re-importing an identifier
/// updates it in place and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpertBase {
    records: RawStore,
}

impl ExpertBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted mapping.
    pub fn from_store(store: RawStore) -> Self {
        Self { records: store }
    }

    /// Read a store file written by [`ExpertBase::save`].
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ExpertBaseError::io(path, e))?;
        let store: RawStore = serde_json::from_str(&content)
            .map_err(|e| ExpertBaseError::parse(format!("{}: {e}", path.display())))?;
        info!(records = store.len(), "loaded expert base");
        Ok(Self::from_store(store))
    }

    /// Build a record from registry data, replacing any record with the same identifier.
    pub fn create_from_registry(
        &mut self,
        identifier: &str,
        biography: Biography,
        employments: Vec<Employment>,
        topic_tags: Vec<String>,
    ) {
        let record = ExpertRecord {
            given_name: biography.given_name,
            family_name: biography.family_name,
            current_employments: employments,
            research_interests: biography.keywords,
            email: biography.email,
            topic_tags,
            ..Default::default()
        };
        if self.records.insert(identifier.to_string(), record).is_some() {
            debug!(identifier, "replaced existing record");
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&ExpertRecord> {
        self.records.get(identifier)
    }

    /// Live access to one record.
    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut ExpertRecord> {
        self.records.get_mut(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of every expert in import order.
    pub fn list(&self) -> Vec<Expert> {
        self.records
            .iter()
            .map(|(id, record)| Expert::new(id.clone(), record.clone()))
            .collect()
    }

    /// Owned copy of the persisted form.
    pub fn to_persistable(&self) -> RawStore {
        self.records.clone()
    }

    /// The store as 4-space indented JSON with non-ASCII kept verbatim.
    pub fn pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.records
            .serialize(&mut ser)
            .map_err(|e| ExpertBaseError::Serialization(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| ExpertBaseError::Serialization(e.to_string()))
    }

    /// Write `{dir}/{file}`, creating `dir` if needed.
    #[instrument(skip(self), fields(records = self.records.len()))]
    pub fn save(&self, dir: &Path, file: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| ExpertBaseError::io(dir, e))?;
        let path = dir.join(file);
        std::fs::write(&path, self.pretty()?).map_err(|e| ExpertBaseError::io(&path, e))?;
        info!(path = %path.display(), "saved expert base");
        Ok(path)
    }

    /// Apply an override table.
    ///
    /// The header is validated first; a bad header leaves every record
    /// untouched. Rows are then applied one by one: unknown identifiers are
    /// skipped, blank cells (including list cells with no entries) are
    /// ignored and short rows count as empty.
    pub fn merge_overrides(&mut self, table: &OverrideTable) -> MergeOutcome {
        let fields = match table.validate() {
            Ok(fields) => fields,
            Err(reason) => {
                warn!(%reason, "override table rejected, nothing merged");
                return MergeOutcome::Rejected { reason };
            }
        };

        let mut report = MergeReport::default();
        for row in &table.rows {
            let Some(identifier) = row.first().map(|c| clean_cell(c)) else {
                continue;
            };
            if identifier.is_empty() {
                continue;
            }
            let Some(record) = self.records.get_mut(identifier) else {
                warn!(identifier, "override for unknown expert skipped");
                report.unknown_ids.push(identifier.to_string());
                continue;
            };

            for (field, cell) in fields.iter().zip(row.iter().skip(1)) {
                if record.set(field, cell) {
                    report.fields_set += 1;
                    info!(identifier, %field, value = %cell, "field set from override");
                }
            }
        }
        MergeOutcome::Applied(report)
    }

    /// Read an override CSV and merge it. Unreadable files are an error.
    pub fn merge_overrides_from_csv(&mut self, path: &Path) -> Result<MergeOutcome> {
        let table = OverrideTable::from_path(path)?;
        Ok(self.merge_overrides(&table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADA: &str = "0000-0002-1825-0097";
    const GRACE: &str = "0000-0001-5109-3700";

    fn biography(given: &str, family: &str) -> Biography {
        Biography {
            given_name: given.into(),
            family_name: family.into(),
            email: format!("{}@example.org", given.to_lowercase()),
            keywords: vec!["Digital Humanities".into()],
        }
    }

    fn base() -> ExpertBase {
        let mut base = ExpertBase::new();
        base.create_from_registry(
            ADA,
            biography("Ada", "Lovelace"),
            vec![Employment::new("Researcher", "", "Universität Hamburg")],
            vec!["Modeling".into()],
        );
        base.create_from_registry(GRACE, biography("Grace", "Hopper"), vec![], vec![]);
        base
    }

    fn table(header: &[&str], rows: &[&[&str]]) -> OverrideTable {
        OverrideTable::new(
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn create_overwrites_same_identifier() {
        let mut base = base();
        base.create_from_registry(ADA, biography("Augusta", "King"), vec![], vec![]);
        assert_eq!(base.len(), 2);
        assert_eq!(base.get(ADA).unwrap().given_name, "Augusta");
    }

    #[test]
    fn list_and_persistable_are_snapshots() {
        let base = base();
        let mut store = base.to_persistable();
        store.get_mut(ADA).unwrap().email = "changed".into();
        let mut experts = base.list();
        experts.clear();
        assert_eq!(base.get(ADA).unwrap().email, "ada@example.org");
        assert_eq!(base.len(), 2);
    }

    fn names(base: &ExpertBase) -> Vec<String> {
        base.list().iter().map(Expert::name).collect()
    }

    #[test]
    fn list_keeps_import_order() {
        let mut base = ExpertBase::new();
        base.create_from_registry(ADA, biography("Zed", "Zimmer"), vec![], vec![]);
        base.create_from_registry(GRACE, biography("Amy", "Adler"), vec![], vec![]);
        assert_eq!(names(&base), vec!["Zed Zimmer", "Amy Adler"]);
        assert_eq!(base.identifiers(), vec![ADA, GRACE]);

        base.create_from_registry(ADA, biography("Zoe", "Zimmer"), vec![], vec![]);
        assert_eq!(names(&base), vec!["Zoe Zimmer", "Amy Adler"]);
    }

    #[test]
    fn import_order_survives_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let mut base = ExpertBase::new();
        base.create_from_registry(ADA, biography("Zed", "Zimmer"), vec![], vec![]);
        base.create_from_registry(GRACE, biography("Amy", "Adler"), vec![], vec![]);

        let path = base.save(tmp.path(), "expertbase.json").unwrap();
        let loaded = ExpertBase::load(&path).unwrap();
        assert_eq!(names(&loaded), vec!["Zed Zimmer", "Amy Adler"]);

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.find(ADA).unwrap() < json.find(GRACE).unwrap());
    }

    #[test]
    fn store_roundtrip_keeps_every_field() {
        let mut base = base();
        base.merge_overrides(&table(&["orcid", "website"], &[&[ADA, "https://example.org"]]));

        let restored = ExpertBase::from_store(base.to_persistable());
        assert_eq!(restored, base);

        let json = base.pretty().unwrap();
        let reparsed: RawStore = serde_json::from_str(&json).unwrap();
        assert_eq!(ExpertBase::from_store(reparsed), base);
    }

    #[test]
    fn pretty_uses_four_spaces_and_keeps_unicode() {
        let json = base().pretty().unwrap();
        assert!(json.contains("\n    \"0000-0001-5109-3700\": {"));
        assert!(json.contains("Universität Hamburg"));
    }

    #[test]
    fn save_creates_directory_and_load_reads_it_back() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("data");
        let path = base().save(&dir, "expertbase.json").unwrap();
        assert!(path.exists());

        let loaded = ExpertBase::load(&path).unwrap();
        assert_eq!(loaded, base());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ExpertBase::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ExpertBaseError::Io { .. }));
    }

    #[test]
    fn absent_stored_fields_default_to_empty() {
        let store: RawStore =
            serde_json::from_str(r#"{"0000-0003-0000-0000": {"family_name": "Noether"}}"#).unwrap();
        let base = ExpertBase::from_store(store);
        let record = base.get("0000-0003-0000-0000").unwrap();
        assert_eq!(record.family_name, "Noether");
        assert!(record.given_name.is_empty());
        assert!(record.research_interests.is_empty());
    }

    #[test]
    fn merge_sets_fields_and_reports_unknown_ids() {
        let mut base = base();
        let outcome = base.merge_overrides(&table(
            &["ORCID", "email", "topic_tags", "room"],
            &[
                &[ADA, "ada@uni-hamburg.de", "Annotating, Modeling", "B 201"],
                &["9999-9999-9999-9999", "x@example.org", "", ""],
            ],
        ));

        let MergeOutcome::Applied(report) = outcome else {
            panic!("expected merge to apply");
        };
        assert_eq!(report.fields_set, 3);
        assert_eq!(report.unknown_ids, vec!["9999-9999-9999-9999"]);

        let ada = base.get(ADA).unwrap();
        assert_eq!(ada.email, "ada@uni-hamburg.de");
        assert_eq!(ada.topic_tags, vec!["Annotating", "Modeling"]);
        assert_eq!(ada.extra.get("room").map(String::as_str), Some("B 201"));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let overrides = table(
            &["orcid", "given_name", "current_employments"],
            &[&[ADA, "Ada", "Professor|Informatik|Uni Köln"]],
        );
        let mut once = base();
        once.merge_overrides(&overrides);
        let mut twice = once.clone();
        twice.merge_overrides(&overrides);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_and_missing_cells_never_overwrite() {
        let mut base = base();
        base.merge_overrides(&table(
            &["orcid", "email", "family_name"],
            &[&[ADA, ""], &[GRACE]],
        ));
        assert_eq!(base.get(ADA).unwrap().email, "ada@example.org");
        assert_eq!(base.get(ADA).unwrap().family_name, "Lovelace");
        assert_eq!(base.get(GRACE).unwrap().family_name, "Hopper");
    }

    #[test]
    fn separator_only_cells_keep_list_fields() {
        let mut base = base();
        base.merge_overrides(&table(&["orcid", "research_interests"], &[&[ADA, "Poetry"]]));
        let before = base.clone();

        let outcome = base.merge_overrides(&table(
            &["orcid", "topic_tags", "research_interests", "email", "current_employments"],
            &[&[ADA, ",", " ", "  ", " ; "], &[GRACE, " , ", ",,", "\t", ";"]],
        ));

        let MergeOutcome::Applied(report) = outcome else {
            panic!("expected merge to apply");
        };
        assert_eq!(report.fields_set, 0);
        assert_eq!(base, before);
        assert_eq!(base.get(ADA).unwrap().topic_tags, vec!["Modeling"]);
        assert_eq!(base.get(ADA).unwrap().research_interests, vec!["Poetry"]);
    }

    #[test]
    fn stored_non_string_extras_do_not_break_loading() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("expertbase.json");
        std::fs::write(
            &path,
            format!(r#"{{"{ADA}": {{"given_name": "A", "orcid_verified": true}}}}"#),
        )
        .unwrap();

        let loaded = ExpertBase::load(&path).unwrap();
        let record = loaded.get(ADA).unwrap();
        assert_eq!(record.given_name, "A");
        assert_eq!(record.extra.get("orcid_verified").map(String::as_str), Some("true"));
    }

    #[test]
    fn bad_header_mutates_nothing() {
        let mut base = base();
        let before = base.clone();

        let outcome = base.merge_overrides(&table(&["name", "email"], &[&[ADA, "evil@example.org"]]));
        assert!(matches!(outcome, MergeOutcome::Rejected { .. }));

        let outcome = base.merge_overrides(&table(&["orcid"], &[&[ADA]]));
        assert!(!outcome.is_applied());

        assert_eq!(base, before);
    }

    #[test]
    fn identifier_cells_are_cleaned() {
        let mut base = base();
        let padded = format!("\u{feff} {ADA} ");
        base.merge_overrides(&table(&["orcid", "email"], &[&[padded.as_str(), "new@example.org"]]));
        assert_eq!(base.get(ADA).unwrap().email, "new@example.org");
    }

    #[test]
    fn merge_from_csv_file() {
        let mut base = base();
        let outcome = base
            .merge_overrides_from_csv(Path::new("../../../fixtures/csv/overrides.csv"))
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(
            base.get(ADA).unwrap().topic_tags,
            vec!["Annotating", "Modeling", "Visualization"]
        );
    }

    #[test]
    fn merge_from_missing_csv_is_error() {
        let mut base = base();
        assert!(base.merge_overrides_from_csv(Path::new("does/not/exist.csv")).is_err());
    }
}
