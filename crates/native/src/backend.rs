// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The native backend: owns subscriptions, pumps the adapter, and runs raw
//! batches through the dispatcher.

use crate::adapter::NativeAdapter;
use crate::cache::{RecentFileCache, DEFAULT_CACHE_SIZE, PREPOPULATE_MAX};
use crate::dispatcher::BatchDispatch;
use crate::raw::{RawEvent, RawFlags, RenameSide};
use crate::rename::RenameTracker;
use crate::rescan;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tw_core::{
    Backend, BackendError, BackendWaker, ChannelId, CommandId, CommandOutcome, EventSink,
    MessageBuffer,
};

/// A live native subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel: ChannelId,
    pub root: PathBuf,
    pub recursive: bool,
}

/// Backend fed by OS notifications through a [`NativeAdapter`].
pub struct NativeBackend<A> {
    adapter: A,
    sink: EventSink,
    subscriptions: HashMap<ChannelId, Subscription>,
    cache: RecentFileCache,
    tracker: RenameTracker,
}

impl<A: NativeAdapter> NativeBackend<A> {
    pub fn new(adapter: A, sink: EventSink) -> Self {
        let tracker = RenameTracker::for_style(adapter.rename_style());
        Self {
            adapter,
            sink,
            subscriptions: HashMap::new(),
            cache: RecentFileCache::new(DEFAULT_CACHE_SIZE),
            tracker,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn process_batch(&mut self, batch: Vec<RawEvent>) -> Result<(), BackendError> {
        let mut buffer = MessageBuffer::new();

        // Directories appearing under a recursive root need watches of their
        // own; note them before the batch is consumed.
        let new_directories: Vec<(ChannelId, PathBuf)> = batch
            .iter()
            .filter(|raw| {
                raw.flags.contains(RawFlags::IS_DIRECTORY)
                    && (raw.flags.contains(RawFlags::CREATED)
                        || raw.side == Some(RenameSide::To))
                    && self
                        .subscriptions
                        .get(&raw.channel)
                        .is_some_and(|s| s.recursive)
            })
            .map(|raw| (raw.channel, raw.path.clone()))
            .collect();

        let (rescans, events): (Vec<RawEvent>, Vec<RawEvent>) = batch
            .into_iter()
            .partition(|raw| raw.flags.contains(RawFlags::MUST_RESCAN));

        let mut dispatch = BatchDispatch::new(
            &mut self.cache,
            &mut self.tracker,
            &mut buffer,
            &self.subscriptions,
        );
        for raw in events {
            dispatch.event(raw);
        }
        dispatch.finish();

        let mut rescanned: Vec<ChannelId> = Vec::new();
        for raw in rescans {
            if rescanned.contains(&raw.channel) {
                continue;
            }
            rescanned.push(raw.channel);
            match self.subscriptions.get(&raw.channel) {
                Some(subscription) => {
                    rescan::refresh(&mut self.cache, subscription, &mut buffer);
                }
                None => {
                    tracing::debug!(channel = %raw.channel, "rescan requested for unknown channel");
                }
            }
        }

        for (channel, path) in new_directories {
            if !self.subscriptions.contains_key(&channel) {
                continue;
            }
            if let Err(err) = self.adapter.track_subdirectory(channel, &path) {
                tracing::debug!(
                    channel = %channel,
                    path = %path.display(),
                    error = %err,
                    "unable to track new subdirectory"
                );
            }
        }

        self.sink.emit_all(buffer.take())?;
        Ok(())
    }
}

impl<A: NativeAdapter> Backend for NativeBackend<A> {
    fn waker(&self) -> Arc<dyn BackendWaker> {
        self.adapter.waker()
    }

    fn listen(&mut self) -> Result<(), BackendError> {
        let batch = self.adapter.listen()?;
        if !batch.is_empty() {
            self.process_batch(batch)?;
        }
        Ok(())
    }

    fn handle_add(
        &mut self,
        _id: CommandId,
        channel: ChannelId,
        root: &Path,
        recursive: bool,
    ) -> Result<CommandOutcome, BackendError> {
        self.adapter.add_root(channel, root, recursive)?;
        self.subscriptions.insert(
            channel,
            Subscription {
                channel,
                root: root.to_path_buf(),
                recursive,
            },
        );
        self.cache.prepopulate(root, PREPOPULATE_MAX, recursive);
        tracing::info!(channel = %channel, root = %root.display(), recursive, "native subscription added");
        Ok(CommandOutcome::acked())
    }

    fn handle_remove(
        &mut self,
        _id: CommandId,
        channel: ChannelId,
    ) -> Result<CommandOutcome, BackendError> {
        if self.subscriptions.remove(&channel).is_some() {
            self.adapter.remove_root(channel)?;
            tracing::info!(channel = %channel, "native subscription removed");
        }
        Ok(CommandOutcome::acked())
    }

    fn set_cache_size(&mut self, entries: usize) {
        self.cache.resize(entries);
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
