//! Error types for the overlay runtime

use std::path::PathBuf;

/// Error type for baseline persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access baseline file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Baseline file '{path}' is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config '{path}' is malformed: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Error type for the streaming input
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to open frame source '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create FIFO '{path}': {source}")]
    CreateFifo {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },

    #[error("Failed to start ingestion thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Error type for the render loop
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Presentation layer failed: {0}")]
    Frontend(String),

    #[error("No backgrounds available in '{0}'")]
    NoBackgrounds(PathBuf),
}
