//! Linux-only smoke tests against the real inotify adapter.

use crate::prelude::*;
use std::time::Duration;
use treewatch::{Action, EntryKind};

#[test]
fn creations_flow_through_inotify() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_native());

    let path = dir.path().join("a.txt");
    std::fs::File::create(&path).unwrap();

    let event = watched.expect_action(Action::Created, &path);
    assert_eq!(event.kind, EntryKind::File);
}

#[test]
fn modifications_flow_through_inotify() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, b"before").unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_native());

    std::fs::write(&path, b"after").unwrap();
    let event = watched.expect_action(Action::Modified, &path);
    assert_eq!(event.kind, EntryKind::File);
}

#[test]
fn deletions_flow_through_inotify() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, b"x").unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_native());

    std::fs::remove_file(&path).unwrap();
    let event = watched.expect_action(Action::Deleted, &path);
    assert_eq!(event.kind, EntryKind::File);
}

#[test]
fn renames_within_the_root_correlate_into_one_event() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("x");
    std::fs::write(&old_path, b"payload").unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_native());

    let new_path = dir.path().join("y");
    std::fs::rename(&old_path, &new_path).unwrap();

    let event = watched.expect_action(Action::Renamed, &new_path);
    assert_eq!(event.old_path, Some(old_path.clone()));

    // The rename must not be shadowed by a split pair.
    let extras = watched.settle();
    assert!(
        !extras
            .iter()
            .any(|e| e.path == old_path || e.path == new_path),
        "rename leaked extra events: {extras:?}"
    );
}

#[test]
fn new_subdirectories_are_tracked_as_they_appear() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_native());

    // Step with pauses so each new watch is in place before the next level.
    std::fs::create_dir(dir.path().join("a")).unwrap();
    watched.expect_action(Action::Created, &dir.path().join("a"));
    std::thread::sleep(Duration::from_millis(50));

    std::fs::create_dir(dir.path().join("a/b")).unwrap();
    watched.expect_action(Action::Created, &dir.path().join("a/b"));
    std::thread::sleep(Duration::from_millis(50));

    let leaf = dir.path().join("a/b/leaf.txt");
    std::fs::File::create(&leaf).unwrap();
    let event = watched.expect_action(Action::Created, &leaf);
    assert_eq!(event.kind, EntryKind::File);
}

#[test]
fn non_recursive_inotify_watches_stay_shallow() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(
        &hub,
        dir.path(),
        treewatch::WatchMode {
            poll: false,
            recursive: false,
        },
    );

    std::fs::create_dir(dir.path().join("sub")).unwrap();
    watched.expect_action(Action::Created, &dir.path().join("sub"));

    std::fs::write(dir.path().join("sub/deep"), b"x").unwrap();
    watched.expect_quiet();
}
