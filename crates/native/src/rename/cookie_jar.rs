// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cookie-paired rename correlation (inotify-style systems).

use crate::cache::RecentFileCache;
use crate::rename::ResolvedRename;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use tw_core::{ChannelId, EntryKind, MessageBuffer};

/// Number of batches a half-event may wait for its partner before it is
/// resolved as a deletion.
pub const DEFAULT_MAX_BATCHES: usize = 2;

/// The "moved from" half of a rename, waiting for its partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameCookie {
    pub channel: ChannelId,
    pub from_path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug, Default)]
struct CookieBatch {
    from_paths: BTreeMap<u32, RenameCookie>,
}

impl CookieBatch {
    fn moved_from(
        &mut self,
        messages: &mut MessageBuffer,
        channel: ChannelId,
        cookie: u32,
        old_path: PathBuf,
        kind: EntryKind,
    ) {
        if let Some(displaced) = self.from_paths.remove(&cookie) {
            // Two renames shared a cookie; we cannot correlate the first one.
            messages.deleted(displaced.channel, displaced.from_path, displaced.kind);
        }

        self.from_paths.insert(
            cookie,
            RenameCookie {
                channel,
                from_path: old_path,
                kind,
            },
        );
    }

    fn yoink(&mut self, cookie: u32) -> Option<RenameCookie> {
        self.from_paths.remove(&cookie)
    }

    fn flush(&mut self, messages: &mut MessageBuffer, cache: &mut RecentFileCache) {
        for (_, cookie) in std::mem::take(&mut self.from_paths) {
            cache.evict_path(&cookie.from_path);
            messages.deleted(cookie.channel, cookie.from_path, cookie.kind);
        }
    }

    fn is_empty(&self) -> bool {
        self.from_paths.is_empty()
    }
}

/// A deque of cookie batches. Each event batch ages the jar by one step;
/// halves that fall off the back are surfaced as deletions.
#[derive(Debug)]
pub struct CookieJar {
    batches: VecDeque<CookieBatch>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self::with_batches(DEFAULT_MAX_BATCHES)
    }

    pub fn with_batches(max_batches: usize) -> Self {
        let mut batches = VecDeque::with_capacity(max_batches);
        for _ in 0..max_batches.max(1) {
            batches.push_back(CookieBatch::default());
        }
        Self { batches }
    }

    /// Record the "moved from" half of a rename in the newest batch.
    pub fn moved_from(
        &mut self,
        messages: &mut MessageBuffer,
        channel: ChannelId,
        cookie: u32,
        old_path: PathBuf,
        kind: EntryKind,
    ) {
        if let Some(batch) = self.batches.back_mut() {
            batch.moved_from(messages, channel, cookie, old_path, kind);
        }
    }

    /// Resolve the "moved to" half of a rename. Emits the resulting messages
    /// and returns the rename if one was produced.
    pub fn moved_to(
        &mut self,
        messages: &mut MessageBuffer,
        channel: ChannelId,
        cookie: u32,
        new_path: PathBuf,
        kind: EntryKind,
    ) -> Option<ResolvedRename> {
        let mut from: Option<RenameCookie> = None;
        for batch in self.batches.iter_mut() {
            if let Some(found) = batch.yoink(cookie) {
                if let Some(older) = from.take() {
                    // Multiple "moved from" halves claimed this cookie; keep
                    // the most recent and resolve the rest as deletions.
                    messages.deleted(older.channel, older.from_path, older.kind);
                }
                from = Some(found);
            }
        }

        let Some(from) = from else {
            // Unmatched "moved to": the entry arrived from outside the
            // watched tree.
            messages.created(channel, new_path, kind);
            return None;
        };

        if from.channel != channel || !from.kind.compatible_with(kind) {
            messages.deleted(from.channel, from.from_path, from.kind);
            messages.created(channel, new_path, kind);
            return None;
        }

        messages.renamed(channel, from.from_path.clone(), new_path.clone(), kind);
        Some(ResolvedRename {
            old_path: from.from_path,
            path: new_path,
            kind,
        })
    }

    /// Age the jar by one batch: unmatched halves in the oldest batch become
    /// deletions (and lose their cache entries), and a fresh batch is
    /// appended.
    pub fn flush_oldest_batch(&mut self, messages: &mut MessageBuffer, cache: &mut RecentFileCache) {
        if let Some(mut oldest) = self.batches.pop_front() {
            oldest.flush(messages, cache);
        }
        self.batches.push_back(CookieBatch::default());
    }

    /// Whether any half-event is still waiting for its partner.
    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(CookieBatch::is_empty)
    }
}

#[cfg(test)]
#[path = "cookie_jar_tests.rs"]
mod tests;
