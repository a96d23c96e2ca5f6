//! Error types for the download queue.
//!
//! Every error here is task-scoped or recoverable; none of them is allowed
//! to take down the worker thread.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or writing the JSON config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures surfaced by the download invoker.
///
/// The `Display` text is what ends up in `Failed` events, so variants carry
/// the backend's own message rather than a classification of it.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Path exists but is a file.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("yt-dlp executable unavailable: {0}")]
    MissingBinary(String),

    #[error("Failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    /// Backend ran but reported an error.
    #[error("{0}")]
    Backend(String),

    #[error("Download backend panicked: {0}")]
    Panicked(String),
}

/// Failures in a log sink.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to write log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
