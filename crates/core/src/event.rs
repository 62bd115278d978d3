// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized filesystem event types

use crate::id::ChannelId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What happened to a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Deleted,
    Modified,
    Renamed,
}

impl Action {
    /// Wire number used by host bindings: created=0 deleted=1 modified=2 renamed=3.
    pub fn code(self) -> u8 {
        match self {
            Action::Created => 0,
            Action::Deleted => 1,
            Action::Modified => 2,
            Action::Renamed => 3,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Created => "created",
            Action::Deleted => "deleted",
            Action::Modified => "modified",
            Action::Renamed => "renamed",
        };
        f.write_str(name)
    }
}

/// The kind of entry an event refers to.
///
/// `Unknown` is a legitimate value (an entry whose kind could not be
/// determined), never a synonym for "missing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

impl EntryKind {
    /// Wire number used by host bindings: file=0 directory=1 symlink=2 unknown=3.
    pub fn code(self) -> u8 {
        match self {
            EntryKind::File => 0,
            EntryKind::Directory => 1,
            EntryKind::Symlink => 2,
            EntryKind::Unknown => 3,
        }
    }

    /// Two kinds are compatible unless both are known and disagree.
    pub fn compatible_with(self, other: EntryKind) -> bool {
        self == EntryKind::Unknown || other == EntryKind::Unknown || self == other
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One normalized event delivered on a subscription channel.
///
/// `old_path` is set exactly when `action` is [`Action::Renamed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub channel: ChannelId,
    pub action: Action,
    pub kind: EntryKind,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<PathBuf>,
}

impl FileEvent {
    pub fn created(channel: ChannelId, path: PathBuf, kind: EntryKind) -> Self {
        Self {
            channel,
            action: Action::Created,
            kind,
            path,
            old_path: None,
        }
    }

    pub fn deleted(channel: ChannelId, path: PathBuf, kind: EntryKind) -> Self {
        Self {
            channel,
            action: Action::Deleted,
            kind,
            path,
            old_path: None,
        }
    }

    pub fn modified(channel: ChannelId, path: PathBuf, kind: EntryKind) -> Self {
        Self {
            channel,
            action: Action::Modified,
            kind,
            path,
            old_path: None,
        }
    }

    pub fn renamed(channel: ChannelId, old_path: PathBuf, path: PathBuf, kind: EntryKind) -> Self {
        Self {
            channel,
            action: Action::Renamed,
            kind,
            path,
            old_path: Some(old_path),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
