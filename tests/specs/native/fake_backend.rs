//! Native-path semantics driven through a scripted adapter.
//!
//! These run on every platform: the "OS" is a FakeAdapter fed cookie-paired
//! raw batches, everything downstream of it is the real pipeline.

use crate::prelude::*;
use parking_lot::Mutex;
use std::sync::mpsc;
use std::time::Duration;
use treewatch::{Action, ChannelId, EntryKind, FileEvent, Hub, WatchMode};
use tw_core::BackendError;
use tw_native::{FakeAdapter, FakeHandle, RawEvent, RawFlags, RenameStyle};

fn scripted_hub(style: RenameStyle) -> (Hub<FakeAdapter>, FakeHandle) {
    let (adapter, handle) = FakeAdapter::new(style);
    let slot = Mutex::new(Some(adapter));
    let hub = Hub::with_adapter_factory(move || {
        slot.lock()
            .take()
            .ok_or_else(|| BackendError::Unhealthy("fake adapter already consumed".into()))
    })
    .unwrap();
    (hub, handle)
}

fn watch_native(
    hub: &Hub<FakeAdapter>,
    root: &std::path::Path,
    recursive: bool,
) -> (ChannelId, mpsc::Receiver<Vec<FileEvent>>) {
    let (ack_tx, ack_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    let channel = hub
        .watch(
            root,
            WatchMode {
                poll: false,
                recursive,
            },
            move |result| {
                ack_tx.send(result).unwrap();
            },
            move |events| {
                let _ = event_tx.send(events.to_vec());
            },
        )
        .unwrap();
    ack_rx.recv_timeout(SPEC_WAIT_MAX).unwrap().unwrap();
    (channel, event_rx)
}

fn next_events(rx: &mpsc::Receiver<Vec<FileEvent>>) -> Vec<FileEvent> {
    rx.recv_timeout(SPEC_WAIT_MAX).unwrap()
}

#[test]
fn a_rename_with_both_cookie_halves_is_one_event() {
    let dir = tempfile::tempdir().unwrap();
    let (hub, handle) = scripted_hub(RenameStyle::Cookies);
    let (channel, events) = watch_native(&hub, dir.path(), true);

    let old_path = dir.path().join("x");
    let new_path = dir.path().join("y");
    std::fs::write(&new_path, b"payload").unwrap();

    handle.push_batch(vec![
        RawEvent::moved_from(channel, old_path.clone(), RawFlags::IS_FILE, 41),
        RawEvent::moved_to(channel, new_path.clone(), RawFlags::IS_FILE, 41),
    ]);

    let batch = next_events(&events);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].action, Action::Renamed);
    assert_eq!(batch[0].old_path, Some(old_path));
    assert_eq!(batch[0].path, new_path);
    assert_eq!(batch[0].kind, EntryKind::File);

    // No stray created/deleted pair follows.
    assert!(events.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn a_move_out_of_the_tree_ages_into_a_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let (hub, handle) = scripted_hub(RenameStyle::Cookies);
    let (channel, events) = watch_native(&hub, dir.path(), true);

    let gone = dir.path().join("gone");
    handle.push_batch(vec![RawEvent::moved_from(
        channel,
        gone.clone(),
        RawFlags::IS_FILE,
        77,
    )]);

    // Unrelated batches age the unpaired half out of the jar; the deletion
    // surfaces at the second batch boundary.
    for name in ["noise-1", "noise-2"] {
        let path = dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        handle.push_batch(vec![RawEvent::new(
            channel,
            path,
            RawFlags::CREATED | RawFlags::IS_FILE,
        )]);
    }

    let deadline = std::time::Instant::now() + SPEC_WAIT_MAX;
    loop {
        let batch = next_events(&events);
        if batch
            .iter()
            .any(|e| e.action == Action::Deleted && e.path == gone)
        {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "deletion never surfaced"
        );
    }
}

#[test]
fn a_move_into_the_tree_is_a_creation() {
    let dir = tempfile::tempdir().unwrap();
    let (hub, handle) = scripted_hub(RenameStyle::Cookies);
    let (channel, events) = watch_native(&hub, dir.path(), true);

    let arrived = dir.path().join("arrived");
    std::fs::write(&arrived, b"x").unwrap();
    handle.push_batch(vec![RawEvent::moved_to(
        channel,
        arrived.clone(),
        RawFlags::IS_FILE,
        99,
    )]);

    let batch = next_events(&events);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].action, Action::Created);
    assert_eq!(batch[0].path, arrived);
}

#[test]
fn inode_paired_renames_work_without_cookies() {
    let dir = tempfile::tempdir().unwrap();
    let (hub, handle) = scripted_hub(RenameStyle::Inodes);
    let (channel, events) = watch_native(&hub, dir.path(), true);

    let old_path = dir.path().join("before");
    std::fs::write(&old_path, b"payload").unwrap();
    // Let the backend observe the entry, then move it.
    handle.push_batch(vec![RawEvent::new(
        channel,
        old_path.clone(),
        RawFlags::CREATED | RawFlags::IS_FILE,
    )]);
    next_events(&events);

    let new_path = dir.path().join("after");
    std::fs::rename(&old_path, &new_path).unwrap();
    handle.push_batch(vec![
        RawEvent::new(channel, old_path.clone(), RawFlags::RENAMED | RawFlags::IS_FILE),
        RawEvent::new(channel, new_path.clone(), RawFlags::RENAMED | RawFlags::IS_FILE),
    ]);

    let batch = next_events(&events);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].action, Action::Renamed);
    assert_eq!(batch[0].old_path, Some(old_path));
    assert_eq!(batch[0].path, new_path);
}

#[test]
fn a_rescan_request_surfaces_missed_changes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("before"), b"x").unwrap();

    let (hub, handle) = scripted_hub(RenameStyle::Cookies);
    let (channel, events) = watch_native(&hub, dir.path(), true);

    // Changes the "OS" dropped on the floor.
    std::fs::remove_file(dir.path().join("before")).unwrap();
    std::fs::write(dir.path().join("after"), b"y").unwrap();

    handle.push_batch(vec![RawEvent::rescan(channel)]);

    let batch = next_events(&events);
    let mut summary: Vec<(Action, std::path::PathBuf)> = batch
        .iter()
        .map(|e| (e.action, e.path.clone()))
        .collect();
    summary.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(
        summary,
        vec![
            (Action::Created, dir.path().join("after")),
            (Action::Deleted, dir.path().join("before")),
        ]
    );
}

#[test]
fn non_recursive_native_watches_gate_deep_events() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let (hub, handle) = scripted_hub(RenameStyle::Cookies);
    let (channel, events) = watch_native(&hub, dir.path(), false);

    let deep = dir.path().join("sub/deep");
    let shallow = dir.path().join("shallow");
    std::fs::write(&deep, b"x").unwrap();
    std::fs::write(&shallow, b"y").unwrap();

    handle.push_batch(vec![
        RawEvent::new(channel, deep, RawFlags::CREATED | RawFlags::IS_FILE),
        RawEvent::new(channel, shallow.clone(), RawFlags::CREATED | RawFlags::IS_FILE),
    ]);

    let batch = next_events(&events);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].path, shallow);
}
