//! Shared types, error model, and configuration for the expert base builder.
//!
//! This crate is the foundation depended on by all other expertbase crates.
//! It provides:
//! - [`ExpertBaseError`], the unified error type
//! - Record types ([`ExpertRecord`], [`Employment`], [`RecordField`], [`RawStore`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LookupConfig, OutputConfig, RegistryConfig, RenderSettings, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ExpertBaseError, Result};
pub use types::{Employment, ExpertRecord, RawStore, RecordField, split_list};
