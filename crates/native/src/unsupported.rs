// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder adapter for platforms without native notification glue.
//!
//! Every subscription attempt fails with a descriptive message, which the hub
//! surfaces as a failed ack; callers fall back to the polling backend.

use crate::adapter::{NativeAdapter, RenameStyle};
use crate::raw::RawEvent;
use std::path::Path;
use std::sync::Arc;
use tw_core::{BackendError, BackendWaker, ChannelId, WakeSignal};

pub struct UnsupportedAdapter {
    signal: Arc<WakeSignal>,
}

impl UnsupportedAdapter {
    pub fn new() -> Result<Self, BackendError> {
        Ok(Self {
            signal: Arc::new(WakeSignal::new()),
        })
    }
}

impl NativeAdapter for UnsupportedAdapter {
    fn rename_style(&self) -> RenameStyle {
        RenameStyle::Inodes
    }

    fn waker(&self) -> Arc<dyn BackendWaker> {
        Arc::clone(&self.signal) as Arc<dyn BackendWaker>
    }

    fn listen(&mut self) -> Result<Vec<RawEvent>, BackendError> {
        self.signal.wait();
        Ok(Vec::new())
    }

    fn add_root(
        &mut self,
        _channel: ChannelId,
        root: &Path,
        _recursive: bool,
    ) -> Result<(), BackendError> {
        Err(BackendError::subscription(
            root,
            "native file notifications are not supported on this platform",
        ))
    }

    fn remove_root(&mut self, _channel: ChannelId) -> Result<(), BackendError> {
        Ok(())
    }

    fn track_subdirectory(
        &mut self,
        _channel: ChannelId,
        _path: &Path,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}
