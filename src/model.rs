/// A single URL waiting in the download queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// URL as submitted by the user (already trimmed)
    pub url: String,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Status update sent from the worker thread to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Free-form line for the log
    LogMessage(String),
    /// The download invoker is about to run for this URL
    Started(String),
    /// Download finished without error
    Completed(String),
    /// Download failed; carries the URL and the error text
    Failed { url: String, error: String },
    /// Fraction downloaded (0.0 to 1.0) for the in-flight URL
    Progress { url: String, fraction: f32 },
}

impl StatusEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::LogMessage(message.into())
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed {
            url: url.into(),
            error: error.into(),
        }
    }

    /// Completed and Failed end a task.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}

/// Lifecycle of the queue worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Queue empty, polling
    Idle,
    /// A task has been dequeued and is being handled
    Processing,
    /// Shutdown observed; no further tasks are taken
    Stopped,
}

impl WorkerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Processing => 1,
            Self::Stopped => 2,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Processing,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}
