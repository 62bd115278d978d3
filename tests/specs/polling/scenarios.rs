//! End-to-end change detection through the polling backend.

use crate::prelude::*;
use std::time::Duration;
use treewatch::{Action, EntryKind};

#[test]
fn touching_a_file_reports_a_creation() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    let path = dir.path().join("a.txt");
    std::fs::write(&path, b"").unwrap();

    let event = watched.expect_action(Action::Created, &path);
    assert_eq!(event.kind, EntryKind::File);
    assert_eq!(event.old_path, None);
    watched.expect_quiet();
}

#[test]
fn appending_reports_a_modification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, b"before").unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    // Give the snapshot a cycle to stabilize, then change the file.
    std::thread::sleep(Duration::from_millis(60));
    std::fs::write(&path, b"before and after").unwrap();

    let event = watched.expect_action(Action::Modified, &path);
    assert_eq!(event.kind, EntryKind::File);
}

#[test]
fn removing_a_file_reports_a_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.txt");
    std::fs::write(&path, b"x").unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    std::fs::remove_file(&path).unwrap();

    let event = watched.expect_action(Action::Deleted, &path);
    assert_eq!(event.kind, EntryKind::File);
    watched.expect_quiet();
}

#[test]
fn renames_surface_as_delete_plus_create() {
    // The polling backend has no rename halves to correlate; a rename is
    // observed as the old entry vanishing and the new one appearing.
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("x");
    std::fs::write(&old_path, b"payload").unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    let new_path = dir.path().join("y");
    std::fs::rename(&old_path, &new_path).unwrap();

    let events = watched.settle();
    assert!(events
        .iter()
        .any(|e| e.action == Action::Deleted && e.path == old_path));
    assert!(events
        .iter()
        .any(|e| e.action == Action::Created && e.path == new_path));
    assert_eq!(events.len(), 2, "unexpected extras in {events:?}");
}

#[test]
fn moves_across_the_root_boundary_are_one_sided() {
    let watched_dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let leaving = watched_dir.path().join("leaving");
    std::fs::write(&leaving, b"x").unwrap();
    std::fs::write(outside.path().join("arriving"), b"y").unwrap();

    let hub = spec_hub();
    let watched = watch_acked(&hub, watched_dir.path(), recursive_poll());

    std::fs::rename(&leaving, outside.path().join("leaving")).unwrap();
    watched.expect_action(Action::Deleted, &leaving);

    let arriving = watched_dir.path().join("arriving");
    std::fs::rename(outside.path().join("arriving"), &arriving).unwrap();
    watched.expect_action(Action::Created, &arriving);
}

#[test]
fn recursive_subtree_creation_reports_parents_before_children() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), recursive_poll());

    std::fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    std::fs::write(dir.path().join("a/b/c/f"), b"x").unwrap();

    let expectations = [
        (dir.path().join("a"), EntryKind::Directory),
        (dir.path().join("a/b"), EntryKind::Directory),
        (dir.path().join("a/b/c"), EntryKind::Directory),
        (dir.path().join("a/b/c/f"), EntryKind::File),
    ];

    let events = watched.settle();
    let creations: Vec<_> = events
        .iter()
        .filter(|e| e.action == Action::Created)
        .collect();
    // Parents are announced before their contents, in causal order.
    assert_eq!(creations.len(), 4, "unexpected creations in {events:?}");
    for (event, (path, kind)) in creations.iter().zip(&expectations) {
        assert_eq!(&event.path, path);
        assert_eq!(&event.kind, kind);
    }
}

#[test]
fn non_recursive_roots_only_report_the_top_level() {
    let dir = tempfile::tempdir().unwrap();
    let hub = spec_hub();
    let watched = watch_acked(&hub, dir.path(), flat_poll());

    std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
    std::fs::write(dir.path().join("a/b/f"), b"x").unwrap();

    let event = watched.expect_action(Action::Created, &dir.path().join("a"));
    assert_eq!(event.kind, EntryKind::Directory);
    watched.expect_quiet();
}
