//! End-to-end `build` pipeline: identifier CSV → registry → resolver → base.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use expertbase_registry::{Biography, RegistryClient, current_employments};
use expertbase_shared::Result;

use crate::base::ExpertBase;
use crate::sources::{self, SourceEntry};

/// Configuration for [`build_base`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Identifier-source CSV.
    pub input: PathBuf,
    /// Reference day for the current-employment decision.
    pub today: NaiveDate,
}

/// Summary of one build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Identifiers stored (new or refreshed).
    pub added: Vec<String>,
    /// Identifiers skipped because the registry had no data.
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each identifier, whether stored or skipped.
    fn expert_processed(&self, identifier: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn expert_processed(&self, _identifier: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Fetch every identifier in the source CSV and store it in `base`.
///
/// Identifiers are processed one after another. An identifier whose person
/// or activities section cannot be fetched is skipped; the run continues.
/// Only a missing or unreadable source file aborts.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub async fn build_base(
    config: &BuildConfig,
    registry: &RegistryClient,
    base: &mut ExpertBase,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();

    progress.phase("Reading identifiers");
    let entries = sources::read_identifier_csv(&config.input)?;
    info!(count = entries.len(), "identifiers to fetch");

    progress.phase("Fetching registry records");
    let total = entries.len();
    let mut added = Vec::new();
    let mut skipped = Vec::new();

    for (i, entry) in entries.into_iter().enumerate() {
        let identifier = entry.identifier.clone();
        if fetch_one(registry, base, entry, config.today).await {
            added.push(identifier.clone());
        } else {
            skipped.push(identifier.clone());
        }
        progress.expert_processed(&identifier, i + 1, total);
    }

    let result = BuildResult {
        added,
        skipped,
        elapsed: start.elapsed(),
    };
    info!(
        added = result.added.len(),
        skipped = result.skipped.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build complete"
    );
    progress.done(&result);
    Ok(result)
}

async fn fetch_one(
    registry: &RegistryClient,
    base: &mut ExpertBase,
    entry: SourceEntry,
    today: NaiveDate,
) -> bool {
    let Some(person) = registry.fetch_person(&entry.identifier).await else {
        warn!(identifier = %entry.identifier, "no person data, skipping");
        return false;
    };
    let Some(activities) = registry.fetch_activities(&entry.identifier).await else {
        warn!(identifier = %entry.identifier, "no activities data, skipping");
        return false;
    };

    let employments = current_employments(&activities, today);
    base.create_from_registry(
        &entry.identifier,
        Biography::from(&person),
        employments,
        entry.topic_tags,
    );
    info!(identifier = %entry.identifier, "expert stored");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertbase_shared::{Employment, RegistryConfig};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADA: &str = "0000-0002-1825-0097";
    const GRACE: &str = "0000-0001-5109-3700";

    #[derive(Default)]
    struct Recording(Mutex<Vec<(String, usize, usize)>>);

    impl ProgressReporter for Recording {
        fn phase(&self, _name: &str) {}
        fn expert_processed(&self, identifier: &str, current: usize, total: usize) {
            self.0
                .lock()
                .unwrap()
                .push((identifier.to_string(), current, total));
        }
        fn done(&self, _result: &BuildResult) {}
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn registry(server: &MockServer) -> RegistryClient {
        RegistryClient::new(&RegistryConfig {
            base_url: format!("{}/v3.0", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn write_csv(dir: &std::path::Path, body: &str) -> PathBuf {
        let path = dir.join("ids.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    async fn mount_json(server: &MockServer, route: String, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn one_row_keeps_only_the_current_employment() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            format!("/v3.0/{ADA}/person"),
            serde_json::json!({
                "name": {"given-names": {"value": "Ada"}, "family-name": {"value": "Lovelace"}},
                "emails": {"email": []},
                "keywords": {"keyword": [{"content": "Poetical Science"}]}
            }),
        )
        .await;
        mount_json(
            &server,
            format!("/v3.0/{ADA}/activities"),
            serde_json::json!({"employments": {"affiliation-group": [
                {"summaries": [{"employment-summary": {
                    "role-title": "Analyst", "department-name": null,
                    "organization": {"name": "Analytical Society"}, "end-date": null}}]},
                {"summaries": [{"employment-summary": {
                    "role-title": "Tutor", "department-name": "Mathematics",
                    "organization": {"name": "University of London"},
                    "end-date": {"year": {"value": "2019"}, "month": null, "day": null}}}]}
            ]}}),
        )
        .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            input: write_csv(tmp.path(), &format!("name,orcid,tags\nAda,{ADA},\"Modeling, Annotating\"\n")),
            today: today(),
        };

        let mut base = ExpertBase::new();
        let result = build_base(&config, &registry(&server), &mut base, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.added, vec![ADA]);
        let record = base.get(ADA).unwrap();
        assert_eq!(
            record.current_employments,
            vec![Employment::new("Analyst", "", "Analytical Society")]
        );
        assert_eq!(record.research_interests, vec!["Poetical Science"]);
        assert_eq!(record.topic_tags, vec!["Modeling", "Annotating"]);
    }

    #[tokio::test]
    async fn failed_identifier_is_skipped_and_run_continues() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v3.0/{ADA}/person")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_json(
            &server,
            format!("/v3.0/{GRACE}/person"),
            serde_json::json!({"name": {"given-names": {"value": "Grace"}, "family-name": {"value": "Hopper"}}}),
        )
        .await;
        mount_json(&server, format!("/v3.0/{GRACE}/activities"), serde_json::json!({})).await;

        let tmp = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            input: write_csv(tmp.path(), &format!("name,orcid\nAda,{ADA}\nGrace,{GRACE}\n")),
            today: today(),
        };

        let progress = Recording::default();
        let mut base = ExpertBase::new();
        let result = build_base(&config, &registry(&server), &mut base, &progress)
            .await
            .unwrap();

        assert_eq!(result.skipped, vec![ADA]);
        assert_eq!(result.added, vec![GRACE]);
        assert_eq!(base.identifiers(), vec![GRACE]);
        assert!(base.get(GRACE).unwrap().current_employments.is_empty());

        let calls = progress.0.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(ADA.to_string(), 1, 2), (GRACE.to_string(), 2, 2)]
        );
    }

    #[tokio::test]
    async fn experts_keep_source_row_order_through_save_and_load() {
        let server = MockServer::start().await;
        for (id, given, family) in [(ADA, "Zed", "Zimmer"), (GRACE, "Amy", "Adler")] {
            mount_json(
                &server,
                format!("/v3.0/{id}/person"),
                serde_json::json!({"name": {
                    "given-names": {"value": given}, "family-name": {"value": family}}}),
            )
            .await;
            mount_json(&server, format!("/v3.0/{id}/activities"), serde_json::json!({})).await;
        }

        let tmp = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            input: write_csv(tmp.path(), &format!("name,orcid\nZed,{ADA}\nAmy,{GRACE}\n")),
            today: today(),
        };

        let mut base = ExpertBase::new();
        build_base(&config, &registry(&server), &mut base, &SilentProgress)
            .await
            .unwrap();
        let names: Vec<String> = base.list().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Zed Zimmer", "Amy Adler"]);

        let path = base.save(tmp.path(), "expertbase.json").unwrap();
        let loaded = ExpertBase::load(&path).unwrap();
        assert_eq!(loaded.identifiers(), vec![ADA, GRACE]);
    }

    #[tokio::test]
    async fn existing_records_survive_a_rebuild() {
        let server = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            input: write_csv(tmp.path(), &format!("name,orcid\nAda,{ADA}\n")),
            today: today(),
        };

        let mut base = ExpertBase::new();
        base.create_from_registry(GRACE, Biography::default(), vec![], vec![]);
        build_base(&config, &registry(&server), &mut base, &SilentProgress)
            .await
            .unwrap();

        assert!(base.contains(GRACE));
        assert!(!base.contains(ADA));
    }

    #[tokio::test]
    async fn missing_source_file_aborts() {
        let server = MockServer::start().await;
        let config = BuildConfig {
            input: PathBuf::from("missing/ids.csv"),
            today: today(),
        };
        let mut base = ExpertBase::new();
        let result = build_base(&config, &registry(&server), &mut base, &SilentProgress).await;
        assert!(result.is_err());
    }
}
