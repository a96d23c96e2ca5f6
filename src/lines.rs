//! Fixed-size buffer of the most recent log lines shown in the window.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Number of lines kept for display
pub const MAX_RECENT_LINES: usize = 10;

/// Timestamp format shared by the on-screen log and the log file
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d, %H:%M:%S";

/// Oldest-evicting buffer of timestamped lines
#[derive(Debug, Default, Clone)]
pub struct RecentLines {
    lines: VecDeque<String>,
}

impl RecentLines {
    pub fn new() -> Self {
        Self {
            lines: VecDeque::with_capacity(MAX_RECENT_LINES + 1),
        }
    }

    /// Append `text` stamped with the current local time.
    pub fn add_line(&mut self, text: &str) {
        self.add_line_at(Local::now(), text);
    }

    pub fn add_line_at(&mut self, at: DateTime<Local>, text: &str) {
        self.lines
            .push_back(format!("{}: {}", at.format(TIMESTAMP_FORMAT), text));
        if self.lines.len() > MAX_RECENT_LINES {
            self.lines.pop_front();
        }
    }

    /// Snapshot of the lines, oldest first.
    pub fn get_lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
