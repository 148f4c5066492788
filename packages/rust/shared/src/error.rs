//! Error types for the expert base builder.
//!
//! Library crates use [`ExpertBaseError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all expertbase operations.
#[derive(Debug, thiserror::Error)]
pub enum ExpertBaseError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the registry or the lookup service.
    #[error("network error: {0}")]
    Network(String),

    /// Response decoding error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed identifier, bad field value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// CSV reading error.
    #[error("CSV error in {path:?}: {message}")]
    Csv { path: PathBuf, message: String },

    /// Template compilation or rendering error.
    #[error("render error: {0}")]
    Render(String),

    /// JSON/YAML serialization error for the store or the listing.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExpertBaseError>;

impl ExpertBaseError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a CSV reader error with the file it came from.
    pub fn csv(path: impl Into<PathBuf>, msg: impl std::fmt::Display) -> Self {
        Self::Csv {
            path: path.into(),
            message: msg.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ExpertBaseError::config("missing base_url");
        assert_eq!(err.to_string(), "config error: missing base_url");

        let err = ExpertBaseError::validation("identifier 1234 is malformed");
        assert!(err.to_string().contains("1234"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = ExpertBaseError::io(
            "data/expertbase.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("expertbase.json"));
        assert!(msg.contains("gone"));
    }
}
