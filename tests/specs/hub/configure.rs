//! Runtime configuration through the hub.

use crate::prelude::*;
use std::sync::mpsc;
use std::time::Duration;
use treewatch::{ConfigUpdate, LogDisposition};

#[test]
fn configure_acks_exactly_once_for_a_multi_part_update() {
    let scratch = tempfile::tempdir().unwrap();
    let hub = spec_hub();

    let (tx, rx) = mpsc::channel();
    hub.configure(
        ConfigUpdate {
            worker_log: Some(LogDisposition::File(scratch.path().join("worker.log"))),
            polling_log: Some(LogDisposition::File(scratch.path().join("polling.log"))),
            polling_throttle: Some(500),
            cache_size: Some(256),
            ..ConfigUpdate::default()
        },
        move |result| {
            tx.send(result).unwrap();
        },
    )
    .unwrap();

    acked(&rx);
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert!(scratch.path().join("worker.log").exists());
    assert!(scratch.path().join("polling.log").exists());
}

#[test]
fn an_empty_update_acks_immediately() {
    let hub = spec_hub();
    let (tx, rx) = mpsc::channel();
    hub.configure(ConfigUpdate::default(), move |result| {
        tx.send(result).unwrap();
    })
    .unwrap();
    acked(&rx);
}

#[test]
fn an_unwritable_log_file_fails_the_ack() {
    let scratch = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let dir = tempfile::tempdir().unwrap();
    // Start the polling worker so the command is handled by a live thread.
    let _watched = watch_acked(&hub, dir.path(), recursive_poll());

    let (tx, rx) = mpsc::channel();
    hub.configure(
        ConfigUpdate {
            polling_log: Some(LogDisposition::File(
                scratch.path().join("missing-dir").join("polling.log"),
            )),
            ..ConfigUpdate::default()
        },
        move |result| {
            tx.send(result).unwrap();
        },
    )
    .unwrap();

    let result = rx.recv_timeout(SPEC_WAIT_MAX).unwrap();
    assert!(result.is_err());
}

#[test]
fn polling_parameters_apply_to_later_subscriptions() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();

    // spec_hub already pushed a short interval; a watch created afterwards
    // must pick it up quickly enough to see changes well inside the window.
    let watched = watch_acked(&hub, dir.path(), recursive_poll());
    std::fs::write(dir.path().join("quick"), b"x").unwrap();
    watched.expect_action(treewatch::Action::Created, &dir.path().join("quick"));
}
