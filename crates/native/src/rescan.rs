// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scan-equivalent refresh, used when the platform reports dropped events.
//!
//! Walks the subscription root, emits creations for entries the cache has
//! never seen and modifications for entries whose stat moved, then surfaces
//! cached entries that vanished as deletions.

use crate::backend::Subscription;
use crate::cache::RecentFileCache;
use std::collections::HashSet;
use std::path::PathBuf;
use tw_core::{KindHints, MessageBuffer};
use walkdir::WalkDir;

pub(crate) fn refresh(
    cache: &mut RecentFileCache,
    subscription: &Subscription,
    buffer: &mut MessageBuffer,
) {
    let root = &subscription.root;
    tracing::info!(
        channel = %subscription.channel,
        root = %root.display(),
        "rescanning after dropped events"
    );

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if !subscription.recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "rescan walk error");
                continue;
            }
        };
        let path = entry.path().to_path_buf();
        let hints = KindHints {
            file: entry.file_type().is_file(),
            directory: entry.file_type().is_dir(),
            symlink: entry.file_type().is_symlink(),
        };
        let former = cache.former_at_path(&path, hints);
        let current = cache.current_at_path(&path, hints);
        if current.is_absent() {
            // Raced away between the listing and the stat.
            continue;
        }
        seen.insert(path.clone());

        if former.is_absent() {
            buffer.created(subscription.channel, path, current.kind());
        } else if former.inode() != current.inode()
            || former.size() != current.size()
            || !former.kind().compatible_with(current.kind())
        {
            buffer.modified(subscription.channel, path, current.kind());
        }
    }

    for cached in cache.paths_under(root) {
        if cached.as_path() == root.as_path() || seen.contains(&cached) {
            continue;
        }
        if !subscription.recursive && cached.parent() != Some(root.as_path()) {
            continue;
        }
        let former = cache.former_at_path(&cached, KindHints::default());
        cache.evict_path(&cached);
        buffer.deleted(subscription.channel, cached, former.kind());
    }

    cache.apply();
    cache.prune();
}
