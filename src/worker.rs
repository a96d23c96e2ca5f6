//! Download queue and the background worker that drains it.
//!
//! UI handlers push URLs onto a shared FIFO. A single worker thread pops them
//! one at a time, downloads each synchronously and reports back through the
//! event relay. Shutdown is cooperative: a flag checked once per loop, so an
//! idle worker notices it within one poll interval. Tasks still queued at
//! shutdown are dropped; a task already dequeued is finished first.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ConfigStore;
use crate::downloader::{Downloader, FetchUpdate};
use crate::error::DownloadError;
use crate::model::{DownloadTask, StatusEvent, WorkerState};
use crate::relay::EventRelay;
use crate::settings::Settings;

/// Failure text when no destination folder has been chosen
pub const NO_FOLDER_MESSAGE: &str = "No download folder selected";

/// Unbounded FIFO shared by the UI (producers) and the worker (consumer)
#[derive(Debug, Clone, Default)]
pub struct DownloadQueue {
    inner: Arc<Mutex<VecDeque<DownloadTask>>>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DownloadTask>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a URL typed by the user. Returns `false` for blank input.
    pub fn enqueue(&self, input: &str) -> bool {
        let url = input.trim();
        if url.is_empty() {
            return false;
        }
        self.push(DownloadTask::new(url));
        true
    }

    pub fn push(&self, task: DownloadTask) {
        self.lock().push_back(task);
    }

    pub fn pop(&self) -> Option<DownloadTask> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Everything the worker thread needs, moved into it on spawn
pub struct QueueWorker {
    queue: DownloadQueue,
    downloader: Downloader,
    config: Arc<ConfigStore>,
    relay: EventRelay,
    poll_interval: Duration,
    task_pause: Duration,
}

impl QueueWorker {
    pub fn new(
        queue: DownloadQueue,
        downloader: Downloader,
        config: Arc<ConfigStore>,
        relay: EventRelay,
    ) -> Self {
        let defaults = Settings::default();
        Self {
            queue,
            downloader,
            config,
            relay,
            poll_interval: defaults.poll_interval,
            task_pause: defaults.task_pause,
        }
    }

    pub fn with_timing(mut self, poll_interval: Duration, task_pause: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.task_pause = task_pause;
        self
    }

    /// Handle one task end to end. Always finishes with exactly one
    /// `Completed` or `Failed` event for `task.url`.
    pub fn process(&self, task: DownloadTask) {
        let url = task.url;
        self.relay
            .emit(StatusEvent::log(format!("Processing download: {url}")));

        let target_path = self.config.target_path();
        if target_path.is_empty() {
            self.relay
                .emit(StatusEvent::log(format!("Error: {NO_FOLDER_MESSAGE}")));
            self.relay.emit(StatusEvent::failed(&url, NO_FOLDER_MESSAGE));
            return;
        }

        self.relay
            .emit(StatusEvent::log(format!("Starting download of: {url}")));
        self.relay
            .emit(StatusEvent::log(format!("Save path: {target_path}")));
        self.relay.emit(StatusEvent::Started(url.clone()));

        let relay = &self.relay;
        let mut report = |update: FetchUpdate| match update {
            FetchUpdate::Progress(fraction) => relay.emit(StatusEvent::Progress {
                url: url.clone(),
                fraction,
            }),
            FetchUpdate::Output(line) => relay.emit(StatusEvent::log(line)),
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.downloader.download(&url, &target_path, &mut report)
        }));

        let error = match outcome {
            Ok(Ok(())) => {
                tracing::info!(%url, "download completed");
                self.relay.emit(StatusEvent::Completed(url));
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => DownloadError::Panicked(panic_message(payload.as_ref())).to_string(),
        };

        tracing::warn!(%url, %error, "download failed");
        self.relay
            .emit(StatusEvent::log(format!("Error in download thread: {error}")));
        self.relay.emit(StatusEvent::failed(url, error));
    }

    fn run(self, shutdown: Arc<AtomicBool>, state: Arc<AtomicU8>) {
        tracing::info!("download queue worker started");
        while !shutdown.load(Ordering::SeqCst) {
            let Some(task) = self.queue.pop() else {
                state.store(WorkerState::Idle.as_u8(), Ordering::SeqCst);
                thread::sleep(self.poll_interval);
                continue;
            };

            state.store(WorkerState::Processing.as_u8(), Ordering::SeqCst);
            self.process(task);
            state.store(WorkerState::Idle.as_u8(), Ordering::SeqCst);

            if !self.task_pause.is_zero() {
                thread::sleep(self.task_pause);
            }
        }
        state.store(WorkerState::Stopped.as_u8(), Ordering::SeqCst);
        tracing::info!(pending = self.queue.len(), "download queue worker stopped");
    }

    /// Start the worker on its own thread.
    pub fn spawn(self) -> std::io::Result<WorkerHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let state = Arc::new(AtomicU8::new(WorkerState::Idle.as_u8()));

        let join = thread::Builder::new().name("download-queue".into()).spawn({
            let shutdown = shutdown.clone();
            let state = state.clone();
            move || self.run(shutdown, state)
        })?;

        Ok(WorkerHandle {
            shutdown,
            state,
            join: Some(join),
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Owner-side handle for a running worker
pub struct WorkerHandle {
    shutdown: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Ask the worker to stop after its current task, without waiting.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Stop the worker and wait up to `timeout` for it to exit.
    /// Returns `true` if the thread finished in time. An in-flight download
    /// that outlives the timeout is abandoned, not interrupted.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        self.request_shutdown();
        let Some(join) = self.join.take() else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !join.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        if !join.is_finished() {
            tracing::warn!(?timeout, "download worker still busy at shutdown; detaching");
            return false;
        }
        if join.join().is_err() {
            tracing::error!("download worker thread panicked");
        }
        true
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.request_shutdown();
    }
}
