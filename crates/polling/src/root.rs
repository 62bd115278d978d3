// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One polled root: a directory tree, its iterator, and the pending ack.

use crate::iterator::PollingIterator;
use crate::record::DirectoryTree;
use std::path::PathBuf;
use tw_core::{ChannelId, ChannelMessageBuffer, CommandId, MessageBuffer};

/// A subscription owned by the polling backend.
#[derive(Debug)]
pub struct PolledRoot {
    channel: ChannelId,
    recursive: bool,
    tree: DirectoryTree,
    iterator: PollingIterator,
    /// The Add command that created this root. Acked once the whole tree has
    /// completed its priming traversal; null afterwards.
    pending_command: CommandId,
}

impl PolledRoot {
    pub fn new(
        root_path: PathBuf,
        channel: ChannelId,
        command: CommandId,
        recursive: bool,
    ) -> Self {
        Self {
            channel,
            recursive,
            tree: DirectoryTree::new(root_path),
            iterator: PollingIterator::new(),
            pending_command: command,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Advance the iterator by up to `throttle_allocation` steps, emitting
    /// into `buffer`, and ack the originating Add once priming completes.
    pub fn advance(&mut self, buffer: &mut MessageBuffer, throttle_allocation: u64) -> u64 {
        let mut channel_buffer = ChannelMessageBuffer::new(buffer, self.channel);
        let progress = self.iterator.advance(
            &mut self.tree,
            &mut channel_buffer,
            self.recursive,
            throttle_allocation,
        );

        if !self.pending_command.is_null() && self.tree.all_populated() {
            channel_buffer.ack(self.pending_command, true, "");
            self.pending_command = CommandId::NULL;
        }

        progress
    }
}

#[cfg(test)]
#[path = "root_tests.rs"]
mod tests;
