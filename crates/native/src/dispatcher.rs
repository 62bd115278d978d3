// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-channel dispatcher: raw native events in, normalized events out.
//!
//! Each raw event is interpreted against the entry's *former* state (the
//! cache) and *current* state (a fresh lstat). Rename-flagged events whose
//! entry is absent both before and now cannot be interpreted yet, since a
//! directory rename elsewhere in the batch may still relocate them; they are
//! deferred and re-evaluated to a fixed point once the batch is done.

use crate::backend::Subscription;
use crate::cache::RecentFileCache;
use crate::raw::{RawEvent, RawFlags, RenameSide};
use crate::rename::{RenameTracker, ResolvedRename};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tw_core::snapshot::remap_prefix;
use tw_core::{ChannelId, EntryKind, MessageBuffer, StatSnapshot};

#[derive(Debug)]
struct DeferredEvent {
    raw: RawEvent,
    /// Path to stat instead of the raw path, once a directory rename has
    /// relocated this entry.
    updated_path: Option<PathBuf>,
    needs_update: bool,
}

impl DeferredEvent {
    fn stat_path(&self) -> &Path {
        self.updated_path.as_deref().unwrap_or(&self.raw.path)
    }
}

/// Dispatch state for one raw batch. Create it, feed every event through
/// [`BatchDispatch::event`], then call [`BatchDispatch::finish`].
pub struct BatchDispatch<'a> {
    cache: &'a mut RecentFileCache,
    tracker: &'a mut RenameTracker,
    buffer: &'a mut MessageBuffer,
    subscriptions: &'a HashMap<ChannelId, Subscription>,
    deferred: Vec<DeferredEvent>,
}

impl<'a> BatchDispatch<'a> {
    pub fn new(
        cache: &'a mut RecentFileCache,
        tracker: &'a mut RenameTracker,
        buffer: &'a mut MessageBuffer,
        subscriptions: &'a HashMap<ChannelId, Subscription>,
    ) -> Self {
        Self {
            cache,
            tracker,
            buffer,
            subscriptions,
            deferred: Vec::new(),
        }
    }

    /// Interpret one raw event, emitting zero or more normalized events.
    pub fn event(&mut self, raw: RawEvent) {
        let Some(subscription) = self.subscriptions.get(&raw.channel) else {
            tracing::trace!(channel = %raw.channel, path = %raw.path.display(), "event for unknown channel dropped");
            return;
        };
        if skip_recursive_event(subscription, &raw.path) {
            return;
        }

        let hints = raw.hints();
        let former = self.cache.former_at_path(&raw.path, hints);
        let current = self.cache.current_at_path(&raw.path, hints);

        if self.should_defer(&raw, &former, &current) {
            self.deferred.push(DeferredEvent {
                raw,
                updated_path: None,
                needs_update: false,
            });
            return;
        }

        let path = raw.path.clone();
        self.emit(&raw, &path, &former, &current);
    }

    /// Resolve deferred renames, age the correlator, and commit the cache.
    pub fn finish(mut self) {
        self.handle_deferred();
        match &mut *self.tracker {
            RenameTracker::Cookies(jar) => jar.flush_oldest_batch(self.buffer, self.cache),
            RenameTracker::Inodes(table) => table.flush_unmatched(self.buffer),
        }
        self.cache.apply();
        self.cache.prune();
    }

    /// Only inode-paired renames benefit from waiting: a cookie correlates
    /// its halves regardless of what the stat said.
    fn should_defer(&self, raw: &RawEvent, former: &StatSnapshot, current: &StatSnapshot) -> bool {
        matches!(self.tracker, RenameTracker::Inodes(_))
            && raw.flags.contains(RawFlags::RENAMED)
            && former.is_absent()
            && current.is_absent()
    }

    fn emit(&mut self, raw: &RawEvent, path: &Path, former: &StatSnapshot, current: &StatSnapshot) {
        if self.emit_if_unambiguous(raw, path, former, current) {
            return;
        }
        if self.emit_if_rename(raw, path, former, current) {
            return;
        }
        if self.emit_if_absent(raw, path, former, current) {
            return;
        }
        self.emit_if_present(raw, path, former, current);
    }

    fn emit_if_unambiguous(
        &mut self,
        raw: &RawEvent,
        path: &Path,
        former: &StatSnapshot,
        current: &StatSnapshot,
    ) -> bool {
        let Some(action) = raw.flags.unambiguous_action() else {
            return false;
        };

        if action == RawFlags::CREATED {
            self.buffer
                .created(raw.channel, path.to_path_buf(), current.kind());
        } else if action == RawFlags::DELETED {
            let kind = if current.kind() != EntryKind::Unknown {
                current.kind()
            } else {
                former.kind()
            };
            self.cache.evict_path(path);
            self.buffer.deleted(raw.channel, path.to_path_buf(), kind);
        } else {
            self.buffer
                .modified(raw.channel, path.to_path_buf(), current.kind());
        }
        true
    }

    fn emit_if_rename(
        &mut self,
        raw: &RawEvent,
        path: &Path,
        former: &StatSnapshot,
        current: &StatSnapshot,
    ) -> bool {
        if !raw.flags.contains(RawFlags::RENAMED) {
            return false;
        }

        let resolved = match &mut *self.tracker {
            RenameTracker::Cookies(jar) => {
                let Some(cookie) = raw.cookie else {
                    // A bare rename flag with no cookie (e.g. the watched
                    // directory itself moved) carries nothing to correlate.
                    return false;
                };
                match raw.side {
                    Some(RenameSide::From) => {
                        let kind = hint_or(raw, former.kind());
                        jar.moved_from(
                            self.buffer,
                            raw.channel,
                            cookie,
                            path.to_path_buf(),
                            kind,
                        );
                        None
                    }
                    Some(RenameSide::To) => {
                        let kind = hint_or(raw, current.kind());
                        jar.moved_to(self.buffer, raw.channel, cookie, path.to_path_buf(), kind)
                    }
                    None => return false,
                }
            }
            RenameTracker::Inodes(table) => {
                if let (Some(inode), Some(size)) = (current.inode(), current.size()) {
                    table.observe_present(
                        self.buffer,
                        raw.channel,
                        path,
                        current.kind(),
                        inode,
                        size,
                    )
                } else if let (Some(inode), Some(size)) = (former.inode(), former.size()) {
                    table.observe_absent(
                        self.buffer,
                        raw.channel,
                        path,
                        former.kind(),
                        inode,
                        size,
                    )
                } else {
                    let kind = hint_or(raw, former.kind());
                    table.observe_absent_untracked(self.buffer, raw.channel, path, kind);
                    None
                }
            }
        };

        if let Some(rename) = resolved {
            self.apply_rename(&rename);
        }
        true
    }

    fn emit_if_absent(
        &mut self,
        raw: &RawEvent,
        path: &Path,
        former: &StatSnapshot,
        current: &StatSnapshot,
    ) -> bool {
        if current.is_present() {
            return false;
        }

        let created = raw.flags.contains(RawFlags::CREATED);
        let deleted = raw.flags.contains(RawFlags::DELETED);

        if former.is_present()
            && !former.kind().compatible_with(current.kind())
            && deleted
            && created
        {
            // Last seen as one kind but flagged as another: the original
            // entry was replaced before both were deleted.
            self.buffer
                .deleted(raw.channel, path.to_path_buf(), former.kind());
            self.buffer
                .created(raw.channel, path.to_path_buf(), current.kind());
        } else if former.is_absent() && created {
            self.buffer
                .created(raw.channel, path.to_path_buf(), current.kind());
        }

        // It is not there now, so it must have been deleted.
        if deleted {
            self.buffer
                .deleted(raw.channel, path.to_path_buf(), current.kind());
            self.cache.evict_path(path);
        }
        true
    }

    fn emit_if_present(
        &mut self,
        raw: &RawEvent,
        path: &Path,
        former: &StatSnapshot,
        current: &StatSnapshot,
    ) -> bool {
        if current.is_absent() {
            return false;
        }

        let created = raw.flags.contains(RawFlags::CREATED);
        let deleted = raw.flags.contains(RawFlags::DELETED);
        let modified = raw.flags.contains(RawFlags::MODIFIED);

        if former.is_present() {
            if deleted && created {
                // Rapid deletion and recreation. A modification just before
                // the deletion or just after the recreation may be lost.
                self.buffer
                    .deleted(raw.channel, path.to_path_buf(), former.kind());
                self.buffer
                    .created(raw.channel, path.to_path_buf(), current.kind());
            } else if modified {
                self.buffer
                    .modified(raw.channel, path.to_path_buf(), current.kind());
            }
        } else if deleted && created {
            // The deletion flag on an entry we have never seen means it was
            // created, deleted, and created again in rapid succession.
            self.buffer
                .created(raw.channel, path.to_path_buf(), former.kind());
            self.buffer
                .deleted(raw.channel, path.to_path_buf(), former.kind());
            self.buffer
                .created(raw.channel, path.to_path_buf(), current.kind());
        } else if created {
            self.buffer
                .created(raw.channel, path.to_path_buf(), current.kind());
        }
        true
    }

    /// A directory rename just resolved: relocate cached entries and any
    /// deferred events beneath the old path.
    fn apply_rename(&mut self, rename: &ResolvedRename) {
        if rename.kind != EntryKind::Directory {
            return;
        }
        self.cache
            .update_for_rename(&rename.old_path, &rename.path);

        for deferred in &mut self.deferred {
            let updated = {
                let stat_path = deferred.stat_path();
                if stat_path != rename.old_path.as_path() && stat_path.starts_with(&rename.old_path)
                {
                    remap_prefix(stat_path, &rename.old_path, &rename.path)
                } else {
                    None
                }
            };
            if let Some(updated) = updated {
                deferred.updated_path = Some(updated);
                deferred.needs_update = true;
            }
        }
    }

    /// Bounded fixed-point re-evaluation of deferred renames: repeat while a
    /// pass resolves at least one event, then flush the remainder.
    fn handle_deferred(&mut self) {
        loop {
            let mut progressed = false;
            let mut index = 0;
            while index < self.deferred.len() {
                if !self.deferred[index].needs_update {
                    index += 1;
                    continue;
                }
                self.deferred[index].needs_update = false;

                let raw = self.deferred[index].raw.clone();
                let path = self.deferred[index].stat_path().to_path_buf();
                let hints = raw.hints();
                let former = self.cache.former_at_path(&path, hints);
                let current = self.cache.current_at_path(&path, hints);
                if former.is_absent() && current.is_absent() {
                    index += 1;
                    continue;
                }

                self.deferred.remove(index);
                progressed = true;
                self.emit_if_rename(&raw, &path, &former, &current);
            }
            if !progressed {
                break;
            }
        }

        for deferred in std::mem::take(&mut self.deferred) {
            let path = deferred.stat_path().to_path_buf();
            let hints = deferred.raw.hints();
            let former = self.cache.former_at_path(&path, hints);
            let current = self.cache.current_at_path(&path, hints);
            self.emit_if_rename(&deferred.raw, &path, &former, &current);
        }
    }
}

fn skip_recursive_event(subscription: &Subscription, path: &Path) -> bool {
    if subscription.recursive {
        return false;
    }
    if path == subscription.root.as_path() {
        return false;
    }
    path.parent() != Some(subscription.root.as_path())
}

fn hint_or(raw: &RawEvent, fallback: EntryKind) -> EntryKind {
    let hinted = raw.hints().guess();
    if hinted != EntryKind::Unknown {
        hinted
    } else {
        fallback
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
