// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tw_core::{Action, FileEvent, MessageBuffer};

fn stat(path: &std::path::Path) -> EntryStat {
    EntryStat::of(&std::fs::symlink_metadata(path).unwrap())
}

#[test]
fn identical_stats_are_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    std::fs::write(&path, b"x").unwrap();

    let first = stat(&path);
    let second = stat(&path);
    assert!(!second.changed_from(&first));
}

#[test]
fn mode_change_is_a_modification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    std::fs::write(&path, b"x").unwrap();
    let before = stat(&path);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        let after = stat(&path);
        assert!(after.changed_from(&before));
    }
}

#[test]
fn inode_change_is_a_modification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    std::fs::write(&path, b"x").unwrap();
    let before = stat(&path);

    // Replace the file wholesale; same path, new inode.
    std::fs::remove_file(&path).unwrap();
    std::fs::write(&path, b"x").unwrap();
    let after = stat(&path);
    #[cfg(unix)]
    assert!(after.changed_from(&before));
}

#[test]
fn scan_includes_entries_that_vanished() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("still-here"), b"x").unwrap();

    let mut tree = DirectoryTree::new(dir.path().to_path_buf());
    // A previous pass recorded an entry that is no longer on disk.
    let ghost = stat(&dir.path().join("still-here"));
    tree.records[DirectoryTree::ROOT]
        .entries
        .insert("ghost".into(), ghost);

    let mut entries = Vec::new();
    tree.scan(DirectoryTree::ROOT, &mut entries);

    let names: Vec<&std::ffi::OsStr> = entries.iter().map(|(name, _)| name.as_os_str()).collect();
    assert!(names.contains(&std::ffi::OsStr::new("still-here")));
    assert!(names.contains(&std::ffi::OsStr::new("ghost")));
}

#[test]
fn unpopulated_records_suppress_events() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f"), b"x").unwrap();

    let mut tree = DirectoryTree::new(dir.path().to_path_buf());
    let mut buffer = MessageBuffer::new();
    let mut queue = std::collections::VecDeque::new();
    {
        let mut bound = ChannelMessageBuffer::new(&mut buffer, tw_core::ChannelId(1));
        tree.entry(
            DirectoryTree::ROOT,
            std::ffi::OsStr::new("f"),
            &mut bound,
            &mut queue,
            true,
        );
    }
    assert!(buffer.is_empty());
}

#[test]
fn populated_records_report_creations() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("f"), b"x").unwrap();

    let mut tree = DirectoryTree::new(dir.path().to_path_buf());
    tree.mark_populated(DirectoryTree::ROOT);

    let mut buffer = MessageBuffer::new();
    let mut queue = std::collections::VecDeque::new();
    {
        let mut bound = ChannelMessageBuffer::new(&mut buffer, tw_core::ChannelId(1));
        tree.entry(
            DirectoryTree::ROOT,
            std::ffi::OsStr::new("f"),
            &mut bound,
            &mut queue,
            true,
        );
    }

    let events: Vec<FileEvent> = buffer
        .take()
        .into_iter()
        .filter_map(|m| match m {
            tw_core::Message::Event(event) => Some(event),
            _ => None,
        })
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, Action::Created);
    assert_eq!(events[0].kind, EntryKind::File);
    assert_eq!(events[0].path, dir.path().join("f"));
}

#[test]
fn subdirectories_are_queued_only_when_recursive() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    for (recursive, expected_queue) in [(true, 1), (false, 0)] {
        let mut tree = DirectoryTree::new(dir.path().to_path_buf());
        let mut buffer = MessageBuffer::new();
        let mut queue = std::collections::VecDeque::new();
        {
            let mut bound = ChannelMessageBuffer::new(&mut buffer, tw_core::ChannelId(1));
            tree.entry(
                DirectoryTree::ROOT,
                std::ffi::OsStr::new("sub"),
                &mut bound,
                &mut queue,
                recursive,
            );
        }
        assert_eq!(queue.len(), expected_queue);
    }
}
