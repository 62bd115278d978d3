// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted adapter for deterministic backend and dispatcher tests.

use crate::adapter::{NativeAdapter, RenameStyle};
use crate::raw::RawEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tw_core::{BackendError, BackendWaker, ChannelId, WakeSignal};

#[derive(Debug, Default)]
struct FakeState {
    batches: VecDeque<Vec<RawEvent>>,
    roots: Vec<(ChannelId, PathBuf, bool)>,
    removed: Vec<ChannelId>,
    tracked: Vec<(ChannelId, PathBuf)>,
    fail_add: Option<String>,
}

/// A [`NativeAdapter`] whose "OS" is a queue of scripted batches.
pub struct FakeAdapter {
    style: RenameStyle,
    signal: Arc<WakeSignal>,
    state: Arc<Mutex<FakeState>>,
}

/// Test-side handle for scripting a [`FakeAdapter`] and inspecting what the
/// backend asked of it.
#[derive(Clone)]
pub struct FakeHandle {
    signal: Arc<WakeSignal>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeAdapter {
    pub fn new(style: RenameStyle) -> (Self, FakeHandle) {
        let signal = Arc::new(WakeSignal::new());
        let state = Arc::new(Mutex::new(FakeState::default()));
        let handle = FakeHandle {
            signal: Arc::clone(&signal),
            state: Arc::clone(&state),
        };
        (
            Self {
                style,
                signal,
                state,
            },
            handle,
        )
    }
}

impl NativeAdapter for FakeAdapter {
    fn rename_style(&self) -> RenameStyle {
        self.style
    }

    fn waker(&self) -> Arc<dyn BackendWaker> {
        Arc::clone(&self.signal) as Arc<dyn BackendWaker>
    }

    fn listen(&mut self) -> Result<Vec<RawEvent>, BackendError> {
        if let Some(batch) = self.state.lock().batches.pop_front() {
            return Ok(batch);
        }
        self.signal.wait();
        Ok(self.state.lock().batches.pop_front().unwrap_or_default())
    }

    fn add_root(
        &mut self,
        channel: ChannelId,
        root: &Path,
        recursive: bool,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_add.take() {
            return Err(BackendError::subscription(root, reason));
        }
        state.roots.push((channel, root.to_path_buf(), recursive));
        Ok(())
    }

    fn remove_root(&mut self, channel: ChannelId) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.removed.push(channel);
        state.roots.retain(|(c, _, _)| *c != channel);
        Ok(())
    }

    fn track_subdirectory(
        &mut self,
        channel: ChannelId,
        path: &Path,
    ) -> Result<(), BackendError> {
        self.state.lock().tracked.push((channel, path.to_path_buf()));
        Ok(())
    }
}

impl FakeHandle {
    /// Queue a batch of raw events and wake a blocked `listen`.
    pub fn push_batch(&self, batch: Vec<RawEvent>) {
        self.state.lock().batches.push_back(batch);
        self.signal.notify();
    }

    /// Make the next `add_root` fail with `reason`.
    pub fn fail_next_add(&self, reason: impl Into<String>) {
        self.state.lock().fail_add = Some(reason.into());
    }

    pub fn roots(&self) -> Vec<(ChannelId, PathBuf, bool)> {
        self.state.lock().roots.clone()
    }

    pub fn removed(&self) -> Vec<ChannelId> {
        self.state.lock().removed.clone()
    }

    pub fn tracked(&self) -> Vec<(ChannelId, PathBuf)> {
        self.state.lock().tracked.clone()
    }
}
