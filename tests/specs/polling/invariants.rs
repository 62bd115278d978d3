//! Universal invariants, exercised through the polling backend.

use crate::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc;
use treewatch::Action;

#[test]
fn no_events_are_delivered_before_the_watch_ack() {
    let dir = tempfile::tempdir().unwrap();
    for index in 0..10 {
        std::fs::write(dir.path().join(format!("seed-{index}")), b"x").unwrap();
    }

    let hub = spec_hub();
    let (ack_tx, ack_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let acked_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let observed = std::sync::Arc::clone(&acked_flag);

    hub.watch(
        dir.path(),
        recursive_poll(),
        move |result| {
            acked_flag.store(true, std::sync::atomic::Ordering::SeqCst);
            ack_tx.send(result).unwrap();
        },
        move |events: &[treewatch::FileEvent]| {
            assert!(
                observed.load(std::sync::atomic::Ordering::SeqCst),
                "events {events:?} delivered before the subscription ack"
            );
            let _ = event_tx.send(events.to_vec());
        },
    )
    .unwrap();

    ack_rx.recv_timeout(SPEC_WAIT_MAX).unwrap().unwrap();
    drop(event_rx);
}

#[test]
fn per_channel_event_order_is_causally_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    let path = dir.path().join("churn");
    std::fs::write(&path, b"one").unwrap();
    watched.expect_action(Action::Created, &path);
    std::fs::remove_file(&path).unwrap();
    watched.expect_action(Action::Deleted, &path);
    std::fs::write(&path, b"two").unwrap();
    watched.expect_action(Action::Created, &path);
}

#[test]
fn replayed_events_reconstruct_the_final_tree() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    std::fs::write(dir.path().join("kept"), b"x").unwrap();
    std::fs::write(dir.path().join("doomed"), b"y").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/inner"), b"z").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(80));
    std::fs::remove_file(dir.path().join("doomed")).unwrap();

    let mut live: HashSet<PathBuf> = HashSet::new();
    for event in watched.settle() {
        match event.action {
            Action::Created | Action::Modified => {
                live.insert(event.path);
            }
            Action::Deleted => {
                let path = event.path;
                live.retain(|p| !p.starts_with(&path));
            }
            Action::Renamed => {}
        }
    }

    let expected: HashSet<PathBuf> = [
        dir.path().join("kept"),
        dir.path().join("sub"),
        dir.path().join("sub/inner"),
    ]
    .into_iter()
    .collect();
    assert_eq!(live, expected);
}

#[test]
fn two_channels_on_the_same_root_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let first = watch_acked(&hub, dir.path(), recursive_poll());
    let second = watch_acked(&hub, dir.path(), recursive_poll());
    assert_ne!(first.channel, second.channel);

    let path = dir.path().join("shared");
    std::fs::write(&path, b"x").unwrap();

    let event_on_first = first.expect_action(Action::Created, &path);
    let event_on_second = second.expect_action(Action::Created, &path);
    assert_eq!(event_on_first.channel, first.channel);
    assert_eq!(event_on_second.channel, second.channel);

    // Tearing one down leaves the other alive.
    let (unwatch_tx, unwatch_rx) = mpsc::channel();
    hub.unwatch(first.channel, move |result| {
        unwatch_tx.send(result).unwrap();
    })
    .unwrap();
    acked(&unwatch_rx);

    let later = dir.path().join("later");
    std::fs::write(&later, b"y").unwrap();
    second.expect_action(Action::Created, &later);
    first.expect_quiet();
}
