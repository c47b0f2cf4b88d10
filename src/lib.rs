//! s3-load-gen - S3 load generator
//!
//! Drives concurrent PUT, GET and LIST workloads against an S3-compatible
//! endpoint for a fixed duration and reports throughput and latency.

use std::fmt;

pub mod bench;
pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod progress;
pub mod storage;
pub mod util;

use storage::StorageError;

// Common error types
#[derive(Debug)]
pub enum LoadGenError {
    /// Local I/O failed (config or results files)
    IoError(std::io::Error),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// Storage call failed outside of a timed operation
    StorageError(StorageError),
    /// Worker task failed to join
    WorkerError(String),
    /// Results persistence error
    PersistenceError(String),
    /// Key discovery found nothing to read
    NoObjectsFound(String),
}

impl fmt::Display for LoadGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadGenError::IoError(err) => write!(f, "I/O error: {}", err),
            LoadGenError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            LoadGenError::StorageError(err) => write!(f, "Storage error: {}", err),
            LoadGenError::WorkerError(msg) => write!(f, "Worker error: {}", msg),
            LoadGenError::PersistenceError(msg) => write!(f, "Results persistence error: {}", msg),
            LoadGenError::NoObjectsFound(prefix) => {
                write!(f, "No objects found with prefix '{}'", prefix)
            }
        }
    }
}

impl std::error::Error for LoadGenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadGenError::IoError(err) => Some(err),
            LoadGenError::StorageError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadGenError {
    fn from(err: std::io::Error) -> Self {
        LoadGenError::IoError(err)
    }
}

impl From<StorageError> for LoadGenError {
    fn from(err: StorageError) -> Self {
        LoadGenError::StorageError(err)
    }
}

impl From<serde_json::Error> for LoadGenError {
    fn from(err: serde_json::Error) -> Self {
        LoadGenError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for LoadGenError {
    fn from(err: toml::de::Error) -> Self {
        LoadGenError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for LoadGenError {
    fn from(err: toml::ser::Error) -> Self {
        LoadGenError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for load generator operations
pub type Result<T> = std::result::Result<T, LoadGenError>;

/// Error presentation helpers for the command line
pub mod error {
    use super::LoadGenError;

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &LoadGenError) -> String {
        match error {
            LoadGenError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your flags and profile file.", msg)
            }
            LoadGenError::NoObjectsFound(prefix) => format!(
                "No objects found with prefix '{}'. Please run the PUT benchmark first.",
                prefix
            ),
            LoadGenError::StorageError(err) => format!(
                "Storage request failed ({}). Check the endpoint, bucket and credentials.",
                err
            ),
            LoadGenError::PersistenceError(_) => {
                "Failed to save results. Check disk space and permissions.".to_string()
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "s3-load-gen";
pub const CONFIG_FILE: &str = "s3-load-gen.toml";
pub const RESULTS_FILE: &str = "results.json";
pub const MAX_RESULTS_HISTORY: usize = 100;
