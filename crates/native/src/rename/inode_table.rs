// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inode/size-paired rename correlation (FSEvents-style systems).

use crate::rename::ResolvedRename;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tw_core::{ChannelId, EntryKind, MessageBuffer};

/// One half of a rename observed but not yet paired, keyed by inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePartial {
    pub channel: ChannelId,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub inode: u64,
    pub size: u64,
    pub entry_is_present: bool,
}

/// Pairs rename halves by inode. A match requires the same inode, an equal
/// size, compatible kinds, the same channel, and opposite presence; the
/// absent side is the old path.
#[derive(Debug, Default)]
pub struct InodeTable {
    observed_by_inode: HashMap<u64, RenamePartial>,
}

impl InodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a rename flag on an entry that is still present on disk.
    pub fn observe_present(
        &mut self,
        messages: &mut MessageBuffer,
        channel: ChannelId,
        path: &Path,
        kind: EntryKind,
        inode: u64,
        size: u64,
    ) -> Option<ResolvedRename> {
        match self.observed_by_inode.get(&inode) {
            None => {
                tracing::trace!(path = %path.display(), inode, size, "first half of rename (present)");
                self.observed_by_inode.insert(
                    inode,
                    RenamePartial {
                        channel,
                        path: path.to_path_buf(),
                        kind,
                        inode,
                        size,
                        entry_is_present: true,
                    },
                );
                None
            }
            Some(existing)
                if existing.channel == channel
                    && existing.kind.compatible_with(kind)
                    && existing.size == size
                    && !existing.entry_is_present =>
            {
                // The absent end is the "from" end; this present end is "to".
                let Some(existing) = self.observed_by_inode.remove(&inode) else {
                    return None;
                };
                tracing::trace!(path = %path.display(), inode, "second half of rename (present)");
                messages.renamed(channel, existing.path.clone(), path.to_path_buf(), kind);
                Some(ResolvedRename {
                    old_path: existing.path,
                    path: path.to_path_buf(),
                    kind,
                })
            }
            Some(existing) => {
                tracing::debug!(
                    path = %path.display(),
                    inode,
                    size,
                    existing_path = %existing.path.display(),
                    existing_size = existing.size,
                    existing_present = existing.entry_is_present,
                    "rename half conflicts with existing partial"
                );
                None
            }
        }
    }

    /// Observe a rename flag on an entry that is gone from disk but has
    /// historic stat data in the cache.
    pub fn observe_absent(
        &mut self,
        messages: &mut MessageBuffer,
        channel: ChannelId,
        path: &Path,
        kind: EntryKind,
        last_inode: u64,
        last_size: u64,
    ) -> Option<ResolvedRename> {
        match self.observed_by_inode.get(&last_inode) {
            None => {
                tracing::trace!(path = %path.display(), inode = last_inode, "first half of rename (absent)");
                self.observed_by_inode.insert(
                    last_inode,
                    RenamePartial {
                        channel,
                        path: path.to_path_buf(),
                        kind,
                        inode: last_inode,
                        size: last_size,
                        entry_is_present: false,
                    },
                );
                None
            }
            Some(existing)
                if existing.channel == channel
                    && existing.kind.compatible_with(kind)
                    && existing.size == last_size
                    && existing.entry_is_present =>
            {
                let Some(existing) = self.observed_by_inode.remove(&last_inode) else {
                    return None;
                };
                tracing::trace!(path = %path.display(), inode = last_inode, "second half of rename (absent)");
                messages.renamed(channel, path.to_path_buf(), existing.path.clone(), kind);
                Some(ResolvedRename {
                    old_path: path.to_path_buf(),
                    path: existing.path,
                    kind,
                })
            }
            Some(existing) => {
                tracing::debug!(
                    path = %path.display(),
                    inode = last_inode,
                    size = last_size,
                    existing_path = %existing.path.display(),
                    "rename half conflicts with existing partial"
                );
                None
            }
        }
    }

    /// Observe a rename flag on an entry that is gone and has no historic
    /// stat data to correlate against: all we can say is that it was deleted.
    pub fn observe_absent_untracked(
        &mut self,
        messages: &mut MessageBuffer,
        channel: ChannelId,
        path: &Path,
        kind: EntryKind,
    ) {
        tracing::trace!(path = %path.display(), "absent rename half without an inode, emitting deletion");
        messages.deleted(channel, path.to_path_buf(), kind);
    }

    /// Convert every partial left at the end of a native batch: present
    /// halves become creations, absent halves deletions.
    pub fn flush_unmatched(&mut self, messages: &mut MessageBuffer) {
        for (_, partial) in self.observed_by_inode.drain() {
            if partial.entry_is_present {
                messages.created(partial.channel, partial.path, partial.kind);
            } else {
                messages.deleted(partial.channel, partial.path, partial.kind);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observed_by_inode.is_empty()
    }
}

#[cfg(test)]
#[path = "inode_table_tests.rs"]
mod tests;
