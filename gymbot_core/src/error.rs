//! Error types for the gymbot_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for gymbot_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store error (fatal for the current step)
    #[error("Session store error: {0}")]
    Store(String),

    /// Backend request failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Referenced entity does not exist (stale id, deleted plan, ...)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Contract violation between flow steps (never reached via intended paths)
    #[error("Protocol error: {0}")]
    Protocol(String),
}
