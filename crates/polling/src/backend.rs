// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The polling backend: a map of polled roots advanced under a shared work
//! budget each tick.

use crate::root::PolledRoot;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tw_core::{
    Backend, BackendError, BackendWaker, ChannelId, CommandId, CommandOutcome, EventSink,
    MessageBuffer, WakeSignal,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_THROTTLE: u64 = 1000;

/// Backend that emulates native notifications by diffing directory scans.
pub struct PollingBackend {
    sink: EventSink,
    signal: Arc<WakeSignal>,
    roots: BTreeMap<ChannelId, PolledRoot>,
    interval: Duration,
    throttle: u64,
}

impl PollingBackend {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            signal: Arc::new(WakeSignal::new()),
            roots: BTreeMap::new(),
            interval: DEFAULT_POLL_INTERVAL,
            throttle: DEFAULT_POLL_THROTTLE,
        }
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// One polling cycle: split the throttle across live roots
    /// proportionally and advance each by its share.
    pub(crate) fn cycle(&mut self) -> Result<(), BackendError> {
        if self.roots.is_empty() {
            return Ok(());
        }

        let mut buffer = MessageBuffer::new();
        let mut remaining = self.throttle;
        let mut roots_left = self.roots.len() as u64;

        for root in self.roots.values_mut() {
            let allotment = remaining / roots_left.max(1);
            let progress = root.advance(&mut buffer, allotment);
            remaining = remaining.saturating_sub(progress);
            roots_left -= 1;
        }

        self.sink.emit_all(buffer.take())?;
        Ok(())
    }
}

impl Backend for PollingBackend {
    fn waker(&self) -> Arc<dyn BackendWaker> {
        Arc::clone(&self.signal) as Arc<dyn BackendWaker>
    }

    fn listen(&mut self) -> Result<(), BackendError> {
        self.cycle()?;
        self.signal.wait_timeout(self.interval);
        Ok(())
    }

    fn handle_add(
        &mut self,
        id: CommandId,
        channel: ChannelId,
        root: &Path,
        recursive: bool,
    ) -> Result<CommandOutcome, BackendError> {
        tracing::info!(channel = %channel, root = %root.display(), recursive, "polled root added");
        self.roots.insert(
            channel,
            PolledRoot::new(root.to_path_buf(), channel, id, recursive),
        );
        // The ack is emitted by the root itself once priming completes.
        Ok(CommandOutcome::deferred())
    }

    fn handle_remove(
        &mut self,
        _id: CommandId,
        channel: ChannelId,
    ) -> Result<CommandOutcome, BackendError> {
        if self.roots.remove(&channel).is_some() {
            tracing::info!(channel = %channel, "polled root removed");
        }
        Ok(CommandOutcome::acked().with_stop(self.roots.is_empty()))
    }

    fn set_polling_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    fn set_polling_throttle(&mut self, throttle: u64) {
        self.throttle = throttle;
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
