//! Worker-to-UI event channel.
//!
//! The worker holds an `EventRelay` and fires events without blocking. The UI
//! thread owns the matching `EventReceiver` and drains it once per frame, so
//! every handler runs on the UI thread in emission order.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::model::StatusEvent;

type Waker = Box<dyn Fn() + Send + Sync>;

/// Sending half, cloneable across threads
#[derive(Clone)]
pub struct EventRelay {
    tx: UnboundedSender<StatusEvent>,
    waker: Arc<OnceCell<Waker>>,
}

/// Receiving half, owned by the UI thread
pub struct EventReceiver {
    rx: UnboundedReceiver<StatusEvent>,
}

/// Create a connected relay/receiver pair.
pub fn event_channel() -> (EventRelay, EventReceiver) {
    let (tx, rx) = unbounded_channel();
    (
        EventRelay {
            tx,
            waker: Arc::new(OnceCell::new()),
        },
        EventReceiver { rx },
    )
}

impl EventRelay {
    /// Queue `event` for the UI thread. Never blocks; dropped silently if the UI is gone.
    pub fn emit(&self, event: StatusEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event receiver dropped; discarding status event");
            return;
        }
        if let Some(wake) = self.waker.get() {
            wake();
        }
    }

    /// Install a callback run after each emission, e.g. a repaint request.
    /// Only the first installed waker is kept.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        let _ = self.waker.set(Box::new(waker));
    }
}

impl EventReceiver {
    /// All events emitted so far and not yet drained, oldest first.
    pub fn drain(&mut self) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Block until the next event arrives or every relay is dropped.
    /// Not for use on the UI thread.
    pub fn recv_blocking(&mut self) -> Option<StatusEvent> {
        self.rx.blocking_recv()
    }
}

/// Keep only the last `Progress` event per URL in a drained batch.
/// All other events pass through untouched and in order.
pub fn coalesce_progress(events: Vec<StatusEvent>) -> Vec<StatusEvent> {
    let mut out: Vec<StatusEvent> = Vec::with_capacity(events.len());
    for event in events {
        if let StatusEvent::Progress { url, .. } = &event {
            if let Some(StatusEvent::Progress { url: prev, .. }) = out.last() {
                if prev == url {
                    out.pop();
                }
            }
        }
        out.push(event);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn drain_preserves_emission_order() {
        let (relay, mut rx) = event_channel();
        relay.emit(StatusEvent::log("a"));
        relay.emit(StatusEvent::Started("u".into()));
        relay.emit(StatusEvent::Completed("u".into()));

        assert_eq!(
            rx.drain(),
            vec![
                StatusEvent::log("a"),
                StatusEvent::Started("u".into()),
                StatusEvent::Completed("u".into()),
            ]
        );
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn emit_from_other_thread() {
        let (relay, mut rx) = event_channel();
        let handle = std::thread::spawn(move || {
            relay.emit(StatusEvent::failed("u", "boom"));
        });
        handle.join().unwrap();

        assert_eq!(rx.recv_blocking(), Some(StatusEvent::failed("u", "boom")));
        assert_eq!(rx.recv_blocking(), None);
    }

    #[test]
    fn emit_after_receiver_dropped_is_ignored() {
        let (relay, rx) = event_channel();
        drop(rx);
        relay.emit(StatusEvent::log("nobody listening"));
    }

    #[test]
    fn waker_runs_per_emission() {
        let (relay, _rx) = event_channel();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        relay.set_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        relay.emit(StatusEvent::log("one"));
        relay.clone().emit(StatusEvent::log("two"));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn coalescing_keeps_terminal_events() {
        let progress = |f| StatusEvent::Progress {
            url: "u".into(),
            fraction: f,
        };
        let events = vec![
            StatusEvent::Started("u".into()),
            progress(0.1),
            progress(0.5),
            progress(0.9),
            StatusEvent::Completed("u".into()),
        ];

        assert_eq!(
            coalesce_progress(events),
            vec![
                StatusEvent::Started("u".into()),
                progress(0.9),
                StatusEvent::Completed("u".into()),
            ]
        );
    }
}
