//! End-to-end scenarios for the download queue worker.
//!
//! These run the real worker thread against stub media backends and inspect
//! the events it emits.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use video_queue::{
    ConfigStore, DownloadError, DownloadQueue, Downloader, EventReceiver, FetchUpdate,
    MediaBackend, QueueWorker, StatusEvent, WorkerHandle, WorkerState, event_channel,
};

const POLL: Duration = Duration::from_millis(20);

/// Backend stub: fixed delay, fails for URLs listed in `fail_on`.
#[derive(Default)]
struct StubBackend {
    delay: Duration,
    fail_on: Vec<String>,
    calls: Mutex<Vec<String>>,
    dir_missing_at_call: AtomicUsize,
}

impl StubBackend {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl MediaBackend for StubBackend {
    fn fetch(
        &self,
        url: &str,
        output_template: &str,
        on_update: &mut dyn FnMut(FetchUpdate),
    ) -> Result<(), DownloadError> {
        let dir = Path::new(output_template).parent().unwrap_or(Path::new(""));
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            self.dir_missing_at_call.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.lock().unwrap().push(url.to_owned());
        thread::sleep(self.delay);
        if self.fail_on.iter().any(|u| u == url) {
            return Err(DownloadError::Backend(format!("ERROR: unsupported URL: {url}")));
        }
        on_update(FetchUpdate::Progress(1.0));
        Ok(())
    }
}

struct Harness {
    queue: DownloadQueue,
    config: Arc<ConfigStore>,
    backend: Arc<StubBackend>,
    events: EventReceiver,
    worker: WorkerHandle,
}

fn start(backend: StubBackend, target_path: &str) -> Harness {
    let queue = DownloadQueue::new();
    let config = Arc::new(ConfigStore::in_memory(target_path));
    let backend = Arc::new(backend);
    let (relay, events) = event_channel();
    let worker = QueueWorker::new(
        queue.clone(),
        Downloader::new(backend.clone()),
        config.clone(),
        relay,
    )
    .with_timing(POLL, Duration::ZERO)
    .spawn()
    .expect("spawn worker");

    Harness {
        queue,
        config,
        backend,
        events,
        worker,
    }
}

/// Collect events until `terminals` Completed/Failed events have arrived.
fn collect_until(events: &mut EventReceiver, terminals: usize) -> Vec<StatusEvent> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = Vec::new();
    while seen.iter().filter(|e: &&StatusEvent| e.is_terminal()).count() < terminals {
        assert!(Instant::now() < deadline, "timed out; got {seen:?}");
        seen.extend(events.drain());
        thread::sleep(Duration::from_millis(5));
    }
    seen
}

fn without_progress(events: Vec<StatusEvent>) -> Vec<StatusEvent> {
    events
        .into_iter()
        .filter(|e| !matches!(e, StatusEvent::Progress { .. }))
        .collect()
}

#[test]
fn processes_tasks_in_enqueue_order() {
    let tmp = TempDir::new().unwrap();
    let mut h = start(
        StubBackend {
            delay: Duration::from_millis(15),
            ..Default::default()
        },
        &tmp.path().join("out").display().to_string(),
    );
    let urls: Vec<String> = (0..5).map(|i| format!("https://example.com/{i}")).collect();
    for url in &urls {
        assert!(h.queue.enqueue(url));
    }

    let events = collect_until(&mut h.events, urls.len());

    let started: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StatusEvent::Started(u) => Some(u.clone()),
            _ => None,
        })
        .collect();
    let completed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StatusEvent::Completed(u) => Some(u.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(started, urls);
    assert_eq!(completed, urls);
    assert_eq!(h.backend.calls(), urls);

    // Task N is fully reported before task N+1 starts.
    let mut open: Option<&str> = None;
    for event in &events {
        match event {
            StatusEvent::Started(u) => {
                assert!(open.is_none(), "overlapping tasks");
                open = Some(u.as_str());
            }
            StatusEvent::Completed(u) => {
                assert_eq!(open, Some(u.as_str()));
                open = None;
            }
            _ => {}
        }
    }
    assert!(h.worker.shutdown(Duration::from_secs(2)));
}

#[test]
fn empty_target_path_fails_without_calling_backend() {
    let mut h = start(StubBackend::default(), "");
    h.queue.enqueue("https://example.com/a");

    let events = collect_until(&mut h.events, 1);

    assert_eq!(
        events,
        vec![
            StatusEvent::log("Processing download: https://example.com/a"),
            StatusEvent::log("Error: No download folder selected"),
            StatusEvent::failed("https://example.com/a", "No download folder selected"),
        ]
    );
    assert!(h.backend.calls().is_empty());
    assert!(h.worker.shutdown(Duration::from_secs(2)));
}

#[test]
fn successful_download_creates_target_and_reports_in_order() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let out_str = out.display().to_string();
    let mut h = start(StubBackend::default(), &out_str);
    assert!(!out.exists());

    h.queue.enqueue("https://example.com/a");
    let events = without_progress(collect_until(&mut h.events, 1));

    assert_eq!(
        events,
        vec![
            StatusEvent::log("Processing download: https://example.com/a"),
            StatusEvent::log("Starting download of: https://example.com/a"),
            StatusEvent::log(format!("Save path: {out_str}")),
            StatusEvent::Started("https://example.com/a".into()),
            StatusEvent::Completed("https://example.com/a".into()),
        ]
    );
    assert!(out.is_dir());
    assert_eq!(h.backend.dir_missing_at_call.load(Ordering::SeqCst), 0);
    assert!(h.queue.is_empty());
    assert!(h.worker.shutdown(Duration::from_secs(2)));
}

#[test]
fn failure_is_isolated_to_its_task() {
    let tmp = TempDir::new().unwrap();
    let mut h = start(
        StubBackend {
            fail_on: vec!["https://example.com/bad".into()],
            ..Default::default()
        },
        &tmp.path().display().to_string(),
    );

    h.queue.enqueue("https://example.com/bad");
    h.queue.enqueue("https://example.com/good");
    let events = without_progress(collect_until(&mut h.events, 2));

    let error = "ERROR: unsupported URL: https://example.com/bad".to_owned();
    let pos = |needle: &StatusEvent| {
        events
            .iter()
            .position(|e| e == needle)
            .unwrap_or_else(|| panic!("missing {needle:?} in {events:?}"))
    };
    let bad_start = pos(&StatusEvent::log("Starting download of: https://example.com/bad"));
    let bad_err = pos(&StatusEvent::log(format!("Error in download thread: {error}")));
    let bad_failed = pos(&StatusEvent::failed("https://example.com/bad", error.clone()));
    let good_start = pos(&StatusEvent::log("Starting download of: https://example.com/good"));
    let good_done = pos(&StatusEvent::Completed("https://example.com/good".into()));

    assert!(bad_start < bad_err && bad_err < bad_failed);
    assert!(bad_failed < good_start && good_start < good_done);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 2);
    assert!(h.worker.shutdown(Duration::from_secs(2)));
}

#[test]
fn target_path_is_read_per_task() {
    let tmp = TempDir::new().unwrap();
    let mut h = start(StubBackend::default(), "");

    h.queue.enqueue("https://example.com/first");
    let first = collect_until(&mut h.events, 1);
    assert!(matches!(first.last(), Some(StatusEvent::Failed { .. })));

    let dir = tmp.path().join("picked").display().to_string();
    h.config.set_target_path(&dir).unwrap();
    h.queue.enqueue("https://example.com/second");
    let second = collect_until(&mut h.events, 1);

    assert!(second.contains(&StatusEvent::log(format!("Save path: {dir}"))));
    assert_eq!(
        second.last(),
        Some(&StatusEvent::Completed("https://example.com/second".into()))
    );
    assert!(h.worker.shutdown(Duration::from_secs(2)));
}

#[test]
fn idle_worker_stops_within_poll_interval() {
    let mut h = start(StubBackend::default(), "");
    thread::sleep(POLL * 2);
    assert_eq!(h.worker.state(), WorkerState::Idle);

    let began = Instant::now();
    assert!(h.worker.shutdown(Duration::from_secs(2)));
    assert!(began.elapsed() < POLL * 10);
    assert_eq!(h.worker.state(), WorkerState::Stopped);
}

#[test]
fn shutdown_with_pending_task_does_not_crash() {
    let tmp = TempDir::new().unwrap();
    let mut h = start(
        StubBackend {
            delay: Duration::from_millis(200),
            ..Default::default()
        },
        &tmp.path().display().to_string(),
    );
    h.queue.enqueue("https://example.com/in-flight");

    // Wait until the first task is being processed, then queue another.
    let deadline = Instant::now() + Duration::from_secs(5);
    while h.worker.state() != WorkerState::Processing {
        assert!(Instant::now() < deadline, "worker never picked up the task");
        thread::sleep(Duration::from_millis(2));
    }
    h.queue.enqueue("https://example.com/pending");

    assert!(h.worker.shutdown(Duration::from_secs(2)));
    assert_eq!(h.worker.state(), WorkerState::Stopped);

    // The in-flight task was finished; the pending one is either untouched or done.
    let events = h.events.drain();
    assert!(events.contains(&StatusEvent::Completed("https://example.com/in-flight".into())));
    let pending_done =
        events.contains(&StatusEvent::Completed("https://example.com/pending".into()));
    assert_eq!(pending_done, h.queue.is_empty());
}
