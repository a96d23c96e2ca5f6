//! Sequential video download queue.
//!
//! A UI thread pushes URLs onto a [`worker::DownloadQueue`]; one background
//! worker pops them in order, hands each to the [`downloader::Downloader`]
//! (yt-dlp by default) and reports progress through the [`relay`] channel.
//! The UI side turns those events into log lines via [`logging::Logger`].

// Worker-to-UI status channel
pub mod relay;
// Download queue and its background worker
pub mod worker;
// Download invoker and the yt-dlp backend
pub mod downloader;
// yt-dlp progress line parsing
pub mod progress;
// Recent log lines shown in the window
pub mod lines;
// Log sinks and diagnostics setup
pub mod logging;
// Persisted download folder
pub mod config;
// Paths and timing
pub mod settings;
// Task and event types
pub mod model;
// Error types
pub mod error;

pub use config::{Config, ConfigStore};
pub use downloader::{Downloader, FetchUpdate, MediaBackend, YtDlpBackend};
pub use error::{ConfigError, DownloadError, LogError};
pub use lines::RecentLines;
pub use logging::{Logger, LogSink};
pub use model::{DownloadTask, StatusEvent, WorkerState};
pub use relay::{EventReceiver, EventRelay, event_channel};
pub use settings::Settings;
pub use worker::{DownloadQueue, QueueWorker, WorkerHandle};
