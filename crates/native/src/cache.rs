// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The recent-file cache: last-known stat snapshots keyed by path.
//!
//! The dispatcher compares an entry's *former* state (the committed snapshot)
//! against its *current* state (a fresh lstat) to disambiguate event flags.
//! Fresh snapshots are staged in a pending map so one raw batch observes a
//! consistent former state throughout, then committed with [`apply`].
//!
//! [`apply`]: RecentFileCache::apply

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tw_core::{EntryKind, KindHints, StatSnapshot};

/// Default bound on committed entries.
pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// Ceiling on entries examined when prepopulating a new subscription.
pub const PREPOPULATE_MAX: usize = 1024;

#[derive(Debug)]
struct CacheEntry {
    snapshot: StatSnapshot,
    stamp: u64,
}

/// LRU-bounded mapping of path → last-known metadata.
///
/// Two indices: by path, and by a monotonic commit stamp that mirrors
/// last-seen order for eviction. Pure data structure apart from the lstat
/// inside [`RecentFileCache::current_at_path`].
#[derive(Debug)]
pub struct RecentFileCache {
    maximum_size: usize,
    pending: BTreeMap<PathBuf, StatSnapshot>,
    by_path: HashMap<PathBuf, CacheEntry>,
    by_stamp: BTreeMap<u64, PathBuf>,
    next_stamp: u64,
}

impl Default for RecentFileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl RecentFileCache {
    pub fn new(maximum_size: usize) -> Self {
        Self {
            maximum_size: maximum_size.max(1),
            pending: BTreeMap::new(),
            by_path: HashMap::new(),
            by_stamp: BTreeMap::new(),
            next_stamp: 0,
        }
    }

    /// The entry's state right now: a staged snapshot if this batch already
    /// observed the path, otherwise a fresh lstat. Present results are staged
    /// into the pending map.
    pub fn current_at_path(&mut self, path: &Path, hints: KindHints) -> StatSnapshot {
        if let Some(staged) = self.pending.get(path) {
            return staged.clone();
        }

        let snapshot = StatSnapshot::at(path.to_path_buf(), hints);
        if snapshot.is_present() {
            self.pending.insert(path.to_path_buf(), snapshot.clone());
        }
        snapshot
    }

    /// The entry's last committed state, or an absent snapshot with a
    /// hint-derived kind if we have never seen it.
    pub fn former_at_path(&self, path: &Path, hints: KindHints) -> StatSnapshot {
        match self.by_path.get(path) {
            Some(entry) => entry.snapshot.clone(),
            None => StatSnapshot::absent(path.to_path_buf(), hints),
        }
    }

    /// Drop the committed entry at `path`, if any.
    pub fn evict_path(&mut self, path: &Path) {
        if let Some(entry) = self.by_path.remove(path) {
            self.by_stamp.remove(&entry.stamp);
        }
    }

    /// Drop a committed entry only if it is still the one given.
    pub fn evict_entry(&mut self, snapshot: &StatSnapshot) {
        let is_current = self
            .by_path
            .get(snapshot.path())
            .is_some_and(|entry| &entry.snapshot == snapshot);
        if is_current {
            let path = snapshot.path().to_path_buf();
            self.evict_path(&path);
        }
    }

    /// Rewrite the paths of every committed entry at or beneath `from_dir` to
    /// the corresponding path under `to_dir`.
    pub fn update_for_rename(&mut self, from_dir: &Path, to_dir: &Path) {
        let moved: Vec<PathBuf> = self
            .by_path
            .keys()
            .filter(|path| path.as_path() == from_dir || path.starts_with(from_dir))
            .cloned()
            .collect();

        for old_path in moved {
            if let Some(entry) = self.by_path.remove(&old_path) {
                match entry.snapshot.renamed_under(from_dir, to_dir) {
                    Some(snapshot) => {
                        let new_path = snapshot.path().to_path_buf();
                        // Displace whatever already sat at the destination.
                        self.evict_path(&new_path);
                        self.by_stamp.insert(entry.stamp, new_path.clone());
                        self.by_path.insert(
                            new_path,
                            CacheEntry {
                                snapshot,
                                stamp: entry.stamp,
                            },
                        );
                    }
                    None => {
                        self.by_stamp.remove(&entry.stamp);
                    }
                }
            }
        }
    }

    /// Commit the pending map into the two indices, displacing any prior
    /// entry at each staged path.
    pub fn apply(&mut self) {
        let staged = std::mem::take(&mut self.pending);
        for (path, snapshot) in staged {
            self.evict_path(&path);
            let stamp = self.next_stamp;
            self.next_stamp += 1;
            self.by_stamp.insert(stamp, path.clone());
            self.by_path.insert(path, CacheEntry { snapshot, stamp });
        }
    }

    /// Evict the oldest committed entries until the cache is within bound.
    pub fn prune(&mut self) {
        if self.by_path.len() <= self.maximum_size {
            return;
        }
        let to_remove = self.by_path.len() - self.maximum_size;
        tracing::debug!(
            entries = self.by_path.len(),
            to_remove,
            "cache over bound, pruning"
        );

        for _ in 0..to_remove {
            let Some((&stamp, _)) = self.by_stamp.iter().next() else {
                break;
            };
            if let Some(path) = self.by_stamp.remove(&stamp) {
                self.by_path.remove(&path);
            }
        }
    }

    /// Warm the cache with a breadth-first walk of `root`, observing up to
    /// `max` directory entries, then commit.
    pub fn prepopulate(&mut self, root: &Path, max: usize, recursive: bool) {
        let bounded_max = max.min(self.maximum_size);
        let mut examined = 0usize;
        let mut next_roots = VecDeque::new();
        next_roots.push_back(root.to_path_buf());

        'walk: while let Some(current_root) = next_roots.pop_front() {
            if examined >= bounded_max {
                break;
            }
            let entries = match std::fs::read_dir(&current_root) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::debug!(dir = %current_root.display(), error = %err, "unable to open directory");
                    continue;
                }
            };

            for entry in entries {
                let Ok(entry) = entry else { continue };
                let hints = entry
                    .file_type()
                    .map(hints_from_file_type)
                    .unwrap_or_default();
                let snapshot = self.current_at_path(&entry.path(), hints);
                if recursive && snapshot.is_present() && snapshot.kind() == EntryKind::Directory {
                    next_roots.push_back(entry.path());
                }

                examined += 1;
                if examined >= bounded_max {
                    break 'walk;
                }
            }
        }

        self.apply();
        tracing::debug!(root = %root.display(), examined, "prepopulated cache");
    }

    /// Change the bound, pruning immediately if the cache is now over it.
    pub fn resize(&mut self, maximum_size: usize) {
        self.maximum_size = maximum_size.max(1);
        self.prune();
    }

    /// Committed paths equal to `root` or beneath it. Used by the rescan
    /// refresh to find entries that vanished while events were being dropped.
    pub fn paths_under(&self, root: &Path) -> Vec<PathBuf> {
        self.by_path
            .keys()
            .filter(|path| path.as_path() == root || path.starts_with(root))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

fn hints_from_file_type(file_type: std::fs::FileType) -> KindHints {
    KindHints {
        file: file_type.is_file(),
        directory: file_type.is_dir(),
        symlink: file_type.is_symlink(),
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
