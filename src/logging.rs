//! User-facing log plus process diagnostics.
//!
//! `Logger` is an explicit object handed to whoever needs to log. It fans
//! each message out to its registered sinks: the daily log file and the
//! recent-lines buffer shown in the window.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};

use crate::error::LogError;
use crate::lines::{RecentLines, TIMESTAMP_FORMAT};

/// Destination for user-facing log messages.
pub trait LogSink: Send {
    fn write(&mut self, at: DateTime<Local>, message: &str) -> Result<(), LogError>;

    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }
}

/// Append-only file per calendar day: `<dir>/log_<YYMMDD>.txt`.
pub struct DailyFileSink {
    dir: PathBuf,
    day: String,
    file: File,
}

impl DailyFileSink {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LogError> {
        Self::open_for(dir.into(), Local::now())
    }

    fn open_for(dir: PathBuf, at: DateTime<Local>) -> Result<Self, LogError> {
        fs::create_dir_all(&dir).map_err(|source| LogError::Io {
            path: dir.clone(),
            source,
        })?;
        let day = day_stamp(at);
        let file = open_append(&file_path(&dir, &day))?;
        Ok(Self { dir, day, file })
    }

    /// Path of the file currently being written.
    pub fn current_path(&self) -> PathBuf {
        file_path(&self.dir, &self.day)
    }
}

impl LogSink for DailyFileSink {
    fn write(&mut self, at: DateTime<Local>, message: &str) -> Result<(), LogError> {
        let day = day_stamp(at);
        if day != self.day {
            self.file = open_append(&file_path(&self.dir, &day))?;
            self.day = day;
        }

        let path = self.current_path();
        let entry = format!("{}: {}\n\n", at.format(TIMESTAMP_FORMAT), message);
        self.file
            .write_all(entry.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|source| LogError::Io { path, source })
    }

    fn flush(&mut self) -> Result<(), LogError> {
        let path = self.current_path();
        self.file
            .flush()
            .map_err(|source| LogError::Io { path, source })
    }
}

fn day_stamp(at: DateTime<Local>) -> String {
    at.format("%y%m%d").to_string()
}

fn file_path(dir: &Path, day: &str) -> PathBuf {
    dir.join(format!("log_{day}.txt"))
}

fn open_append(path: &Path) -> Result<File, LogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Recent-lines buffer shared between the logger and the window.
#[derive(Debug, Clone, Default)]
pub struct SharedLines(Arc<Mutex<RecentLines>>);

impl SharedLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, RecentLines> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_lines(&self) -> Vec<String> {
        self.lock().get_lines()
    }
}

impl LogSink for SharedLines {
    fn write(&mut self, at: DateTime<Local>, message: &str) -> Result<(), LogError> {
        self.lock().add_line_at(at, message);
        Ok(())
    }
}

/// Fan-out logger owned by the UI thread.
pub struct Logger {
    sinks: Vec<Box<dyn LogSink>>,
    recent: SharedLines,
}

impl Logger {
    /// Logger with the recent-lines buffer registered and no file.
    pub fn new() -> Self {
        let recent = SharedLines::new();
        Self {
            sinks: vec![Box::new(recent.clone())],
            recent,
        }
    }

    /// Logger writing to the daily file under `log_dir` and the recent-lines buffer.
    pub fn with_log_dir(log_dir: impl Into<PathBuf>) -> Result<Self, LogError> {
        let mut logger = Self::new();
        logger.register(Box::new(DailyFileSink::open(log_dir)?));
        Ok(logger)
    }

    pub fn register(&mut self, sink: Box<dyn LogSink>) {
        self.sinks.push(sink);
    }

    pub fn recent(&self) -> &SharedLines {
        &self.recent
    }

    pub fn last_line(&self) -> Option<String> {
        self.recent.lock().last().map(str::to_owned)
    }

    /// Record `message` in every sink. Blank messages are dropped.
    pub fn log(&mut self, message: &str) {
        self.log_at(Local::now(), message);
    }

    pub fn log_at(&mut self, at: DateTime<Local>, message: &str) {
        if message.trim().is_empty() {
            return;
        }
        tracing::info!(target: "video_queue::log", "{message}");
        for sink in &mut self.sinks {
            if let Err(e) = sink.write(at, message) {
                tracing::warn!(error = %e, "log sink write failed");
            }
        }
    }

    pub fn flush(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                tracing::warn!(error = %e, "log sink flush failed");
            }
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the stderr diagnostics subscriber (`RUST_LOG` overrides the default filter).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "video_queue=info,video_queue_downloader=info".into());

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
