//! Persistent download folder selection.
//!
//! The file holds a single JSON object, `{"targetPath": "..."}`. The UI thread
//! is the only writer; the worker reads a fresh snapshot for every task.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::ConfigError;

/// Contents of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Destination folder; empty means "not selected yet"
    #[serde(rename = "targetPath", default)]
    pub target_path: String,
}

/// Config file plus its in-memory copy
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Config>,
}

impl ConfigStore {
    /// Load `path`, creating it with an empty target path when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.exists() {
            write_config(&path, &Config::default())?;
        }
        let config = read_config(&path)?;
        tracing::debug!(path = %path.display(), target_path = %config.target_path, "loaded config");
        Ok(Self {
            path,
            current: RwLock::new(config),
        })
    }

    /// In-memory store with no backing file writes, for tests and ad-hoc use.
    pub fn in_memory(target_path: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            current: RwLock::new(Config {
                target_path: target_path.into(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current target path.
    pub fn target_path(&self) -> String {
        self.snapshot().target_path
    }

    pub fn snapshot(&self) -> Config {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Persist a new target path, then publish it to readers.
    pub fn set_target_path(&self, target_path: impl Into<String>) -> Result<(), ConfigError> {
        let next = Config {
            target_path: target_path.into(),
        };
        if !self.path.as_os_str().is_empty() {
            write_config(&self.path, &next)?;
        }
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
        Ok(())
    }

    /// Re-read the file after it was changed outside the application.
    pub fn reload(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let config = read_config(&self.path)?;
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = config;
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let json = serde_json::to_string(config).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    replace_file(path, |file| file.write_all(json.as_bytes()))
}

/// Write into a temp file next to `path`, then rename it over `path`.
/// A failed write leaves the previous file untouched.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut NamedTempFile) -> std::io::Result<()>,
) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    write(&mut tmp).and_then(|_| tmp.as_file().sync_all()).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
