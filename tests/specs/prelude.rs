//! Test helpers for the behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use treewatch::{Action, ChannelId, ConfigUpdate, FileEvent, Hub, WatchMode};

/// Outer bound on any single wait. Generous so loaded CI machines pass;
/// the happy path finishes in milliseconds.
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(10);

/// Window used to assert that nothing (more) arrives.
pub const SPEC_QUIET: Duration = Duration::from_millis(400);

/// Polling interval pushed to every spec hub so polled scenarios are fast.
pub const SPEC_POLL_INTERVAL_MS: u64 = 15;

/// A hub with the spec polling interval already applied and acked.
pub fn spec_hub() -> Hub {
    let hub = Hub::new().unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    hub.configure(
        ConfigUpdate {
            polling_interval_ms: Some(SPEC_POLL_INTERVAL_MS),
            ..ConfigUpdate::default()
        },
        move |result| {
            tx.send(result).unwrap();
        },
    )
    .unwrap();
    rx.recv_timeout(SPEC_WAIT_MAX).unwrap().unwrap();
    hub
}

/// A subscription whose ack has fired, plus the stream of delivered batches.
pub struct Watched {
    pub channel: ChannelId,
    pub events: Receiver<Vec<FileEvent>>,
}

/// Watch `root` and wait for the subscription ack.
pub fn watch_acked(hub: &Hub, root: &Path, mode: WatchMode) -> Watched {
    let (ack_tx, ack_rx) = std::sync::mpsc::channel();
    let (event_tx, event_rx) = std::sync::mpsc::channel();
    let channel = hub
        .watch(
            root,
            mode,
            move |result| {
                ack_tx.send(result).unwrap();
            },
            move |events| {
                let _ = event_tx.send(events.to_vec());
            },
        )
        .unwrap();
    let acked = ack_rx
        .recv_timeout(SPEC_WAIT_MAX)
        .expect("subscription ack never arrived")
        .expect("subscription failed");
    assert_eq!(acked, channel);
    Watched {
        channel,
        events: event_rx,
    }
}

pub fn recursive_poll() -> WatchMode {
    WatchMode {
        poll: true,
        recursive: true,
    }
}

pub fn flat_poll() -> WatchMode {
    WatchMode {
        poll: true,
        recursive: false,
    }
}

pub fn recursive_native() -> WatchMode {
    WatchMode {
        poll: false,
        recursive: true,
    }
}

impl Watched {
    /// Wait until an event matching `predicate` arrives, returning it along
    /// with everything else observed on the way.
    pub fn expect_event(&self, predicate: impl Fn(&FileEvent) -> bool) -> FileEvent {
        let deadline = Instant::now() + SPEC_WAIT_MAX;
        let mut seen = Vec::new();
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .unwrap_or_else(|| {
                    panic!("timed out waiting for a matching event; saw {seen:?}")
                });
            match self.events.recv_timeout(remaining) {
                Ok(batch) => {
                    for event in batch {
                        if predicate(&event) {
                            return event;
                        }
                        seen.push(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    panic!("timed out waiting for a matching event; saw {seen:?}")
                }
                Err(RecvTimeoutError::Disconnected) => {
                    panic!("event stream closed; saw {seen:?}")
                }
            }
        }
    }

    /// Wait for a specific `(action, path)` pair.
    pub fn expect_action(&self, action: Action, path: &Path) -> FileEvent {
        self.expect_event(|event| event.action == action && event.path == path)
    }

    /// Assert that no events at all arrive within the quiet window.
    pub fn expect_quiet(&self) {
        match self.events.recv_timeout(SPEC_QUIET) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(batch) => panic!("expected quiet, got {batch:?}"),
            Err(RecvTimeoutError::Disconnected) => {}
        }
    }

    /// Collect every event that arrives until the stream stays quiet for the
    /// quiet window.
    pub fn settle(&self) -> Vec<FileEvent> {
        let mut all = Vec::new();
        while let Ok(batch) = self.events.recv_timeout(SPEC_QUIET) {
            all.extend(batch);
        }
        all
    }
}

/// Wait for an unwatch (or configure) ack.
pub fn acked(rx: &Receiver<Result<(), treewatch::AckError>>) {
    rx.recv_timeout(SPEC_WAIT_MAX)
        .expect("ack never arrived")
        .expect("command failed");
}
