// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pluggable boundary between the native backend and per-OS glue.
//!
//! An adapter owns the OS notification handles for every subscription routed
//! to the native backend. It knows nothing about normalization; it blocks,
//! wakes, and hands back batches of [`RawEvent`]s.

use crate::raw::RawEvent;
use std::path::Path;
use std::sync::Arc;
use tw_core::{BackendError, BackendWaker, ChannelId};

/// Which rename-correlation strategy an adapter's raw events call for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameStyle {
    /// The kernel pairs rename halves with a short-lived cookie (inotify).
    Cookies,
    /// The kernel only flags participation in a rename; halves are paired by
    /// inode and size (FSEvents).
    Inodes,
}

pub trait NativeAdapter: Send + 'static {
    fn rename_style(&self) -> RenameStyle;

    /// Handle used to interrupt a blocked [`NativeAdapter::listen`].
    fn waker(&self) -> Arc<dyn BackendWaker>;

    /// Block until woken or until the OS delivers notifications. Returns the
    /// raw batch, which is empty when the return was a wake.
    fn listen(&mut self) -> Result<Vec<RawEvent>, BackendError>;

    /// Register a subscription root. Recursive roots cover the whole tree
    /// beneath them.
    fn add_root(
        &mut self,
        channel: ChannelId,
        root: &Path,
        recursive: bool,
    ) -> Result<(), BackendError>;

    /// Drop every registration belonging to `channel`. Unknown channels are
    /// not an error.
    fn remove_root(&mut self, channel: ChannelId) -> Result<(), BackendError>;

    /// Register a directory that appeared beneath a recursive root after the
    /// root itself was registered.
    fn track_subdirectory(&mut self, channel: ChannelId, path: &Path)
        -> Result<(), BackendError>;
}
