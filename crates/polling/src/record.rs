// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory records: per-directory stat bookkeeping for a polled tree.
//!
//! Records form a tree with parent links and shared children; to keep
//! ownership single they live in an arena indexed by position, and paths are
//! recomputed by walking parent indices.

use std::collections::{HashMap, VecDeque};
use std::ffi::{OsStr, OsString};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::PathBuf;
use tw_core::snapshot::kind_of;
use tw_core::{ChannelMessageBuffer, EntryKind};

pub(crate) type RecordIndex = usize;

/// Stat fields compared between polling passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryStat {
    pub kind: EntryKind,
    inode: u64,
    mode: u32,
    mtime: (i64, i64),
    ctime: (i64, i64),
}

#[cfg(unix)]
impl EntryStat {
    fn of(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            kind: kind_of(metadata),
            inode: metadata.ino(),
            mode: metadata.mode(),
            mtime: (metadata.mtime(), metadata.mtime_nsec()),
            ctime: (metadata.ctime(), metadata.ctime_nsec()),
        }
    }
}

#[cfg(not(unix))]
impl EntryStat {
    fn of(metadata: &Metadata) -> Self {
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| (d.as_secs() as i64, d.subsec_nanos() as i64))
            .unwrap_or((0, 0));
        Self {
            kind: kind_of(metadata),
            inode: 0,
            mode: 0,
            mtime,
            ctime: (0, 0),
        }
    }
}

impl EntryStat {
    /// A modification is a forward move of mtime or ctime, an inode change,
    /// or a mode change.
    pub(crate) fn changed_from(&self, previous: &EntryStat) -> bool {
        self.inode != previous.inode
            || self.mode != previous.mode
            || previous.mtime < self.mtime
            || previous.ctime < self.ctime
    }
}

#[derive(Debug, Default)]
struct DirectoryRecord {
    parent: Option<RecordIndex>,
    /// Full path for the root record, a single component for everything else.
    name: PathBuf,
    entries: HashMap<OsString, EntryStat>,
    subdirectories: HashMap<OsString, RecordIndex>,
    populated: bool,
}

/// Arena of [`DirectoryRecord`]s for one polled root.
#[derive(Debug)]
pub struct DirectoryTree {
    records: Vec<DirectoryRecord>,
    free: Vec<RecordIndex>,
}

impl DirectoryTree {
    pub(crate) const ROOT: RecordIndex = 0;

    pub fn new(root_path: PathBuf) -> Self {
        Self {
            records: vec![DirectoryRecord {
                parent: None,
                name: root_path,
                ..DirectoryRecord::default()
            }],
            free: Vec::new(),
        }
    }

    pub(crate) fn path_of(&self, index: RecordIndex) -> PathBuf {
        match self.records[index].parent {
            None => self.records[index].name.clone(),
            Some(parent) => self.path_of(parent).join(&self.records[index].name),
        }
    }

    pub(crate) fn mark_populated(&mut self, index: RecordIndex) {
        self.records[index].populated = true;
    }

    /// Whether every record reachable from the root has completed its first
    /// scan.
    pub fn all_populated(&self) -> bool {
        let mut pending = vec![Self::ROOT];
        while let Some(index) = pending.pop() {
            let record = &self.records[index];
            if !record.populated {
                return false;
            }
            pending.extend(record.subdirectories.values().copied());
        }
        true
    }

    /// List the directory, pushing every basename present now plus every
    /// basename recorded by the previous pass, so vanished entries still get
    /// their comparison step.
    pub(crate) fn scan(&self, index: RecordIndex, entries: &mut Vec<(OsString, EntryKind)>) {
        let dir = self.path_of(index);
        let mut scanned: Vec<OsString> = Vec::new();

        match std::fs::read_dir(&dir) {
            Ok(listing) => {
                for entry in listing {
                    let Ok(entry) = entry else { continue };
                    let kind = entry
                        .file_type()
                        .map(|t| {
                            if t.is_symlink() {
                                EntryKind::Symlink
                            } else if t.is_dir() {
                                EntryKind::Directory
                            } else if t.is_file() {
                                EntryKind::File
                            } else {
                                EntryKind::Unknown
                            }
                        })
                        .unwrap_or(EntryKind::Unknown);
                    scanned.push(entry.file_name());
                    entries.push((entry.file_name(), kind));
                }
            }
            Err(err) => {
                tracing::debug!(dir = %dir.display(), error = %err, "unable to scan directory");
            }
        }

        for (name, stat) in &self.records[index].entries {
            if !scanned.contains(name) {
                entries.push((name.clone(), stat.kind));
            }
        }
    }

    /// Stat one basename of `index`, compare against the recorded state, emit
    /// the difference, and update the record.
    pub(crate) fn entry(
        &mut self,
        index: RecordIndex,
        entry_name: &OsStr,
        buffer: &mut ChannelMessageBuffer<'_>,
        queue: &mut VecDeque<RecordIndex>,
        recursive: bool,
    ) {
        let entry_path = self.path_of(index).join(entry_name);

        let current = match std::fs::symlink_metadata(&entry_path) {
            Ok(metadata) => Some(EntryStat::of(&metadata)),
            Err(err) => {
                if !matches!(err.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) {
                    tracing::debug!(path = %entry_path.display(), error = %err, "unable to stat entry");
                }
                None
            }
        };
        let previous = self.records[index].entries.remove(entry_name);
        let populated = self.records[index].populated;

        match (&previous, &current) {
            (Some(previous), Some(current)) => {
                if populated && current.changed_from(previous) {
                    buffer.modified(entry_path.clone(), current.kind);
                }
            }
            (Some(previous), None) => {
                if populated {
                    buffer.deleted(entry_path.clone(), previous.kind);
                }
            }
            (None, Some(current)) => {
                if populated {
                    buffer.created(entry_path.clone(), current.kind);
                }
            }
            (None, None) => {
                // Raced away between the listing and the stat.
                if populated {
                    buffer.created(entry_path.clone(), EntryKind::Unknown);
                    buffer.deleted(entry_path.clone(), EntryKind::Unknown);
                }
            }
        }

        let current_kind = current.as_ref().map(|stat| stat.kind);
        if let Some(current) = current {
            self.records[index]
                .entries
                .insert(entry_name.to_os_string(), current);
        }

        let existing_child = self.records[index].subdirectories.get(entry_name).copied();
        match current_kind {
            Some(EntryKind::Directory) if recursive => {
                let child = match existing_child {
                    Some(child) => child,
                    None => {
                        // A subdirectory discovered after its parent primed is
                        // itself new; it inherits the populated flag so its
                        // contents surface as creations.
                        let child = self.allocate(DirectoryRecord {
                            parent: Some(index),
                            name: PathBuf::from(entry_name),
                            populated,
                            ..DirectoryRecord::default()
                        });
                        self.records[index]
                            .subdirectories
                            .insert(entry_name.to_os_string(), child);
                        child
                    }
                };
                queue.push_back(child);
            }
            Some(EntryKind::Directory) | Some(EntryKind::Unknown) | None => {}
            Some(_) => {
                if let Some(child) = existing_child {
                    self.records[index].subdirectories.remove(entry_name);
                    self.release(child);
                }
            }
        }
    }

    fn allocate(&mut self, record: DirectoryRecord) -> RecordIndex {
        match self.free.pop() {
            Some(index) => {
                self.records[index] = record;
                index
            }
            None => {
                self.records.push(record);
                self.records.len() - 1
            }
        }
    }

    fn release(&mut self, index: RecordIndex) {
        let children: Vec<RecordIndex> = self.records[index]
            .subdirectories
            .values()
            .copied()
            .collect();
        for child in children {
            self.release(child);
        }
        self.records[index] = DirectoryRecord {
            populated: true,
            ..DirectoryRecord::default()
        };
        self.free.push(index);
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
