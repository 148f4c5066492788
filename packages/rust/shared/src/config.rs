//! Application configuration for the expert base builder.
//!
//! User config lives at `~/.expertbase/expertbase.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ExpertBaseError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "expertbase.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".expertbase";

// ---------------------------------------------------------------------------
// Config structs (matching expertbase.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Researcher registry (ORCID public API) settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Structured-knowledge lookup (Wikidata) settings.
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Detail page rendering.
    #[serde(default)]
    pub render: RenderSettings,
}

/// `[registry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL; requests go to `{base_url}/{identifier}/{section}`.
    #[serde(default = "default_registry_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            timeout_secs: default_registry_timeout(),
        }
    }
}

fn default_registry_url() -> String {
    "https://pub.orcid.org/v3.0".into()
}
fn default_registry_timeout() -> u64 {
    30
}

/// `[lookup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Search endpoint of the lookup service.
    #[serde(default = "default_lookup_endpoint")]
    pub endpoint: String,

    /// Search language passed as the `language` query parameter.
    #[serde(default = "default_language")]
    pub language: String,

    /// Descriptive User-Agent with contact info, required by the service's robot policy.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connect/read timeout per attempt, in seconds.
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,

    /// Number of retries after a rate-limit response.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds, doubled on every retry.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound for the backoff delay in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_lookup_endpoint(),
            language: default_language(),
            user_agent: default_user_agent(),
            timeout_secs: default_lookup_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl LookupConfig {
    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Initial backoff as a [`Duration`].
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff ceiling as a [`Duration`].
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

fn default_lookup_endpoint() -> String {
    "https://www.wikidata.org/w/api.php".into()
}
fn default_language() -> String {
    "de".into()
}
fn default_user_agent() -> String {
    concat!(
        "ExpertBaseBuilder/",
        env!("CARGO_PKG_VERSION"),
        " (https://github.com/Nolram567/Expert-Base-Builder; mbgdevelopment@proton.me)"
    )
    .into()
}
fn default_lookup_timeout() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    1_000
}
fn default_max_backoff() -> u64 {
    60_000
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding the persisted store.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// File name of the persisted store.
    #[serde(default = "default_store_file")]
    pub store_file: String,

    /// Directory receiving the rendered detail pages.
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Path of the YAML listing file.
    #[serde(default = "default_listing_file")]
    pub listing_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            store_file: default_store_file(),
            pages_dir: default_pages_dir(),
            listing_file: default_listing_file(),
        }
    }
}

impl OutputConfig {
    /// Full path of the persisted store.
    pub fn store_path(&self) -> PathBuf {
        Path::new(&self.store_dir).join(&self.store_file)
    }
}

fn default_store_dir() -> String {
    "data".into()
}
fn default_store_file() -> String {
    "expertbase.json".into()
}
fn default_pages_dir() -> String {
    "experts".into()
}
fn default_listing_file() -> String {
    "expertbase.yml".into()
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Path to the detail page template.
    #[serde(default = "default_template")]
    pub template: String,

    /// Optional JSON file mapping topic tags to tooltip texts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltips: Option<String>,

    /// How many current employments a detail page lists.
    #[serde(default = "default_employment_limit")]
    pub employment_limit: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            template: default_template(),
            tooltips: None,
            employment_limit: default_employment_limit(),
        }
    }
}

fn default_template() -> String {
    "templates/expert.qmd".into()
}
fn default_employment_limit() -> usize {
    3
}

impl AppConfig {
    /// Reject configurations whose service URLs cannot be parsed.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.registry.base_url).map_err(|e| {
            ExpertBaseError::config(format!(
                "invalid registry.base_url '{}': {e}",
                self.registry.base_url
            ))
        })?;
        Url::parse(&self.lookup.endpoint).map_err(|e| {
            ExpertBaseError::config(format!(
                "invalid lookup.endpoint '{}': {e}",
                self.lookup.endpoint
            ))
        })?;
        if self.lookup.user_agent.trim().is_empty() {
            return Err(ExpertBaseError::config(
                "lookup.user_agent must not be empty; the lookup service requires contact info",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.expertbase/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ExpertBaseError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.expertbase/expertbase.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ExpertBaseError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ExpertBaseError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ExpertBaseError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ExpertBaseError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ExpertBaseError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
