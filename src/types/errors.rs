//! Error types for rtcache.
//!
//! Producer failures are never wrapped in [`RuntimeCacheError`]: they reach the
//! caller of `get_or_try_compute` with their own type.

use thiserror::Error;

/// Default result type for rtcache.
pub type RuntimeCacheResult<T> = Result<T, RuntimeCacheError>;

/// Errors raised outside of the producer path.
#[derive(Error, Debug)]
pub enum RuntimeCacheError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Namespace '{namespace}' holds values of type {existing}, requested {requested}")]
    TypeMismatch {
        namespace: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("{0}")]
    Other(String),
}

impl RuntimeCacheError {
    /// Creates a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
