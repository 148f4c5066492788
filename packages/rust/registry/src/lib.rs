//! Researcher registry client and employment resolution.
//!
//! Fetches an identifier's `person` and `activities` sections from the ORCID
//! public API. A failed fetch is never fatal: it is logged and reported as
//! "no data" so the caller can skip that identifier and keep going.

pub mod employment;
pub mod model;

use std::time::Duration;

use expertbase_shared::{ExpertBaseError, RegistryConfig, Result};
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

pub use employment::{MISSING_YEAR_SENTINEL, current_employments, is_current};
pub use model::{ActivitiesResponse, Biography, FuzzyDate, PersonResponse};

/// User-Agent string for registry requests.
const USER_AGENT: &str = concat!("ExpertBaseBuilder/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Sub-resources of a registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Names, emails, keywords.
    Person,
    /// Employment and other affiliation history.
    Activities,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Activities => "activities",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RegistryClient
// ---------------------------------------------------------------------------

/// HTTP client for the researcher registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    /// Build a client from the `[registry]` config section.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            ExpertBaseError::config(format!("invalid registry URL '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExpertBaseError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `{base_url}/{identifier}/{section}`.
    pub fn endpoint(&self, identifier: &str, section: Section) -> String {
        format!("{}/{identifier}/{section}", self.base_url)
    }

    /// Fetch and decode one section. Any failure yields `None` after a warning.
    #[instrument(skip(self))]
    pub async fn fetch<T: DeserializeOwned>(&self, identifier: &str, section: Section) -> Option<T> {
        let url = self.endpoint(identifier, section);
        match self.try_fetch(&url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(identifier, error = %e, "registry fetch failed");
                None
            }
        }
    }

    /// Fetch the `person` section.
    pub async fn fetch_person(&self, identifier: &str) -> Option<PersonResponse> {
        self.fetch(identifier, Section::Person).await
    }

    /// Fetch the `activities` section.
    pub async fn fetch_activities(&self, identifier: &str) -> Option<ActivitiesResponse> {
        self.fetch(identifier, Section::Activities).await
    }

    async fn try_fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "requesting registry record");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ExpertBaseError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ExpertBaseError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ExpertBaseError::parse(format!("{url}: {e}")))
    }
}
