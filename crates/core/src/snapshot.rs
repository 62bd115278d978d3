// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time metadata snapshots of filesystem entries.
//!
//! A snapshot is either *present* (the lstat succeeded, and we know the kind,
//! inode, and size) or *absent* (the entry was missing or unreadable, and the
//! kind is guessed from event flags). Snapshots are immutable once taken.

use crate::event::EntryKind;
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Kind hints carried by a raw event. Used to guess the kind of an entry we
/// could not stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindHints {
    pub file: bool,
    pub directory: bool,
    pub symlink: bool,
}

impl KindHints {
    pub fn file() -> Self {
        Self {
            file: true,
            ..Self::default()
        }
    }

    pub fn directory() -> Self {
        Self {
            directory: true,
            ..Self::default()
        }
    }

    pub fn symlink() -> Self {
        Self {
            symlink: true,
            ..Self::default()
        }
    }

    /// Best guess at a kind from flags alone. Contradictory hints guess
    /// `Unknown`.
    pub fn guess(self) -> EntryKind {
        if self.symlink {
            EntryKind::Symlink
        } else if self.file && !self.directory {
            EntryKind::File
        } else if self.directory && !self.file {
            EntryKind::Directory
        } else {
            EntryKind::Unknown
        }
    }
}

impl From<EntryKind> for KindHints {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => Self::file(),
            EntryKind::Directory => Self::directory(),
            EntryKind::Symlink => Self::symlink(),
            EntryKind::Unknown => Self::default(),
        }
    }
}

/// The last-known or just-observed state of one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatSnapshot {
    Present {
        path: PathBuf,
        kind: EntryKind,
        inode: u64,
        size: u64,
        last_seen: Instant,
    },
    Absent {
        path: PathBuf,
        kind: EntryKind,
    },
}

impl StatSnapshot {
    /// lstat `path`. Transient failures (the entry raced away, permissions,
    /// symlink loops, over-long names, a path component that stopped being a
    /// directory) are swallowed into an absent snapshot with a hint-derived
    /// kind; anything else is logged first.
    pub fn at(path: PathBuf, hints: KindHints) -> StatSnapshot {
        match std::fs::symlink_metadata(&path) {
            Ok(metadata) => StatSnapshot::Present {
                kind: kind_of(&metadata),
                inode: inode_of(&metadata),
                size: metadata.len(),
                last_seen: Instant::now(),
                path,
            },
            Err(err) => {
                if !is_transient(&err) {
                    tracing::debug!(path = %path.display(), error = %err, "lstat failed");
                }
                StatSnapshot::Absent {
                    path,
                    kind: hints.guess(),
                }
            }
        }
    }

    pub fn absent(path: PathBuf, hints: KindHints) -> StatSnapshot {
        StatSnapshot::Absent {
            path,
            kind: hints.guess(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, StatSnapshot::Present { .. })
    }

    pub fn is_absent(&self) -> bool {
        !self.is_present()
    }

    pub fn path(&self) -> &Path {
        match self {
            StatSnapshot::Present { path, .. } | StatSnapshot::Absent { path, .. } => path,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            StatSnapshot::Present { kind, .. } | StatSnapshot::Absent { kind, .. } => *kind,
        }
    }

    pub fn inode(&self) -> Option<u64> {
        match self {
            StatSnapshot::Present { inode, .. } => Some(*inode),
            StatSnapshot::Absent { .. } => None,
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            StatSnapshot::Present { size, .. } => Some(*size),
            StatSnapshot::Absent { .. } => None,
        }
    }

    pub fn last_seen(&self) -> Option<Instant> {
        match self {
            StatSnapshot::Present { last_seen, .. } => Some(*last_seen),
            StatSnapshot::Absent { .. } => None,
        }
    }

    /// A copy of this snapshot relocated under `to` if its path is `from` or
    /// lies beneath it. `None` when the rename does not affect this path.
    pub fn renamed_under(&self, from: &Path, to: &Path) -> Option<StatSnapshot> {
        let path = remap_prefix(self.path(), from, to)?;
        let mut moved = self.clone();
        match &mut moved {
            StatSnapshot::Present { path: p, .. } | StatSnapshot::Absent { path: p, .. } => {
                *p = path;
            }
        }
        Some(moved)
    }
}

/// Rewrite `path` from under `from` to the corresponding path under `to`.
pub fn remap_prefix(path: &Path, from: &Path, to: &Path) -> Option<PathBuf> {
    let suffix = path.strip_prefix(from).ok()?;
    if suffix.as_os_str().is_empty() {
        Some(to.to_path_buf())
    } else {
        Some(to.join(suffix))
    }
}

/// Classify a stat result. Symlinks win because the lstat never followed
/// them.
pub fn kind_of(metadata: &Metadata) -> EntryKind {
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Unknown
    }
}

#[cfg(unix)]
pub fn inode_of(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
pub fn inode_of(_metadata: &Metadata) -> u64 {
    0
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::NotFound
            | ErrorKind::PermissionDenied
            | ErrorKind::FilesystemLoop
            | ErrorKind::InvalidFilename
            | ErrorKind::NotADirectory
            | ErrorKind::ResourceBusy
    )
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
