//! Free-text → structured-knowledge identifier resolution.
//!
//! Queries the Wikidata `wbsearchentities` action and returns the first hit's
//! identifier (QID). The resolver never fails: when nothing usable comes back
//! the caller gets [`LookupResult::Unresolved`], whose [`LookupResult::key`]
//! echoes the query so downstream deduplication can still proceed.
//!
//! Rate limiting (HTTP 429) is answered with exponential backoff, see
//! [`RetryPolicy`].

mod memo;

use std::future::Future;
use std::time::Duration;

use expertbase_shared::{ExpertBaseError, LookupConfig, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, instrument, warn};
use url::Url;

pub use memo::MemoLookup;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why a lookup fell back to the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The service answered but had no hit.
    NoMatch,
    /// The response body could not be decoded.
    Decode,
    /// Transport failure or a non-success status other than 429.
    Request,
    /// Every attempt was rate limited.
    RetriesExhausted,
}

/// Outcome of a single lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Resolved { id: String },
    Unresolved { query: String, reason: UnresolvedReason },
}

impl LookupResult {
    /// The resolved identifier, or the original query text.
    pub fn key(&self) -> &str {
        match self {
            Self::Resolved { id } => id,
            Self::Unresolved { query, .. } => query,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    fn unresolved(query: &str, reason: UnresolvedReason) -> Self {
        Self::Unresolved {
            query: query.to_string(),
            reason,
        }
    }
}

/// Anything that can turn an organization name into a lookup key.
pub trait EntityLookup {
    fn resolve(&self, query: &str) -> impl Future<Output = LookupResult> + Send;
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Backoff schedule for rate-limited requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): doubled each time, capped.
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl From<&LookupConfig> for RetryPolicy {
    fn from(config: &LookupConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }
}

// ---------------------------------------------------------------------------
// LookupClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

/// One HTTP attempt's verdict.
enum Attempt {
    RateLimited,
    Done(LookupResult),
}

/// HTTP client for the lookup service.
#[derive(Debug, Clone)]
pub struct LookupClient {
    client: Client,
    endpoint: String,
    language: String,
    policy: RetryPolicy,
}

impl LookupClient {
    /// Build a client from the `[lookup]` config section.
    pub fn new(config: &LookupConfig) -> Result<Self> {
        Url::parse(&config.endpoint).map_err(|e| {
            ExpertBaseError::config(format!("invalid lookup endpoint '{}': {e}", config.endpoint))
        })?;
        if config.user_agent.trim().is_empty() {
            return Err(ExpertBaseError::config(
                "lookup requests need a descriptive User-Agent with contact info",
            ));
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| ExpertBaseError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
            policy: RetryPolicy::from(config),
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Resolve `query`, retrying on rate limits.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &str) -> LookupResult {
        let mut retries = 0;

        while retries <= self.policy.max_retries {
            match self.attempt(query).await {
                Attempt::Done(result) => return result,
                Attempt::RateLimited => {
                    let delay = self.policy.delay(retries);
                    warn!(
                        delay_ms = delay.as_millis() as u64,
                        retry = retries + 1,
                        "HTTP 429 Too Many Requests, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }

        error!(max_retries = self.policy.max_retries, "lookup retries exhausted");
        LookupResult::unresolved(query, UnresolvedReason::RetriesExhausted)
    }

    async fn attempt(&self, query: &str) -> Attempt {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "wbsearchentities"),
                ("language", self.language.as_str()),
                ("format", "json"),
                ("search", query),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "lookup request failed");
                return Attempt::Done(LookupResult::unresolved(query, UnresolvedReason::Request));
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::RateLimited;
        }
        if !status.is_success() {
            error!(%status, "lookup request rejected");
            return Attempt::Done(LookupResult::unresolved(query, UnresolvedReason::Request));
        }

        match response.json::<SearchResponse>().await {
            Ok(body) => match body.search.into_iter().next() {
                Some(hit) => {
                    debug!(id = %hit.id, "lookup resolved");
                    Attempt::Done(LookupResult::Resolved { id: hit.id })
                }
                None => {
                    warn!("no lookup match, echoing query");
                    Attempt::Done(LookupResult::unresolved(query, UnresolvedReason::NoMatch))
                }
            },
            Err(e) => {
                error!(error = %e, "lookup response could not be decoded");
                Attempt::Done(LookupResult::unresolved(query, UnresolvedReason::Decode))
            }
        }
    }
}

impl EntityLookup for LookupClient {
    async fn resolve(&self, query: &str) -> LookupResult {
        self.lookup(query).await
    }
}
