use std::path::PathBuf;
use std::time::Duration;

/// Application paths and worker timing
#[derive(Debug, Clone)]
pub struct Settings {
    /// JSON file holding the selected download folder
    pub config_file: PathBuf,
    /// Directory for the daily log files
    pub log_dir: PathBuf,
    /// How long the idle worker sleeps between queue checks
    pub poll_interval: Duration,
    /// Pause after each task before the next dequeue
    pub task_pause: Duration,
    /// Upper bound on waiting for the worker at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("config.json"),
            log_dir: PathBuf::from("./Log"),
            poll_interval: Duration::from_secs(1),
            task_pause: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}
