//! Hub lifecycle: ack uniqueness, channel allocation, unwatch semantics.

use crate::prelude::*;
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn every_watch_gets_exactly_one_ack() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();

    let (ack_tx, ack_rx) = mpsc::channel();
    let channel = hub
        .watch(
            dir.path(),
            recursive_poll(),
            move |result| {
                ack_tx.send(result).unwrap();
            },
            |_events| {},
        )
        .unwrap();

    assert_eq!(ack_rx.recv_timeout(SPEC_WAIT_MAX).unwrap().unwrap(), channel);
    assert!(ack_rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn channel_ids_strictly_increase_across_watches() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();

    let first = watch_acked(&hub, dir.path(), recursive_poll());
    let second = watch_acked(&hub, dir.path(), recursive_poll());
    assert!(second.channel > first.channel);
    assert!(first.channel.as_u32() >= 1);
}

#[test]
fn existing_entries_produce_no_events_after_the_ack() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pre-existing"), b"x").unwrap();
    std::fs::create_dir(dir.path().join("old-dir")).unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());
    watched.expect_quiet();
}

#[test]
fn unwatch_acks_once_and_the_channel_goes_silent() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    // A burst of activity right before the unwatch.
    for index in 0..5 {
        std::fs::write(dir.path().join(format!("burst-{index}")), b"x").unwrap();
    }

    let (unwatch_tx, unwatch_rx) = mpsc::channel();
    hub.unwatch(watched.channel, move |result| {
        unwatch_tx.send(result).unwrap();
    })
    .unwrap();
    acked(&unwatch_rx);
    assert!(unwatch_rx.recv_timeout(Duration::from_millis(300)).is_err());

    // Whatever was already delivered is fine; nothing more may arrive.
    let _ = watched.settle();
    std::fs::write(dir.path().join("after-unwatch"), b"x").unwrap();
    watched.expect_quiet();
}

#[test]
fn unwatching_an_unknown_channel_still_acks() {
    let hub = spec_hub();
    let (unwatch_tx, unwatch_rx) = mpsc::channel();
    hub.unwatch(treewatch::ChannelId(999), move |result| {
        unwatch_tx.send(result).unwrap();
    })
    .unwrap();
    acked(&unwatch_rx);
}

#[test]
fn status_tracks_subscriptions_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();

    let before = hub.status();
    assert_eq!(before.channel_callback_count, 0);
    assert_eq!(before.worker_thread_ok, "ok");
    assert_eq!(before.polling_thread_ok, "ok");

    let watched = watch_acked(&hub, dir.path(), recursive_poll());
    let during = hub.status();
    assert_eq!(during.channel_callback_count, 1);
    assert!(during.polling_thread_active);

    let (unwatch_tx, unwatch_rx) = mpsc::channel();
    hub.unwatch(watched.channel, move |result| {
        unwatch_tx.send(result).unwrap();
    })
    .unwrap();
    acked(&unwatch_rx);
    assert_eq!(hub.status().channel_callback_count, 0);
}
