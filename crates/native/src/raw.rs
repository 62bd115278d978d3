// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw events as produced by platform adapters.
//!
//! This is the flag alphabet the dispatcher understands. Adapters translate
//! whatever their notification API delivers into these bits; everything past
//! the adapter boundary is platform-independent.

use bitflags::bitflags;
use std::path::PathBuf;
use tw_core::{ChannelId, KindHints};

bitflags! {
    /// Normalized native event flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RawFlags: u16 {
        const CREATED = 1 << 0;
        const DELETED = 1 << 1;
        const MODIFIED = 1 << 2;
        const RENAMED = 1 << 3;
        const IS_FILE = 1 << 4;
        const IS_DIRECTORY = 1 << 5;
        const IS_SYMLINK = 1 << 6;
        /// The platform lost events; the subscription needs a scan-equivalent
        /// refresh.
        const MUST_RESCAN = 1 << 7;
    }
}

impl RawFlags {
    pub fn hints(self) -> KindHints {
        KindHints {
            file: self.contains(RawFlags::IS_FILE),
            directory: self.contains(RawFlags::IS_DIRECTORY),
            symlink: self.contains(RawFlags::IS_SYMLINK),
        }
    }

    /// Exactly one action bit among created/deleted/modified is set, with no
    /// rename ambiguity.
    pub fn unambiguous_action(self) -> Option<RawFlags> {
        let actions = self
            & (RawFlags::CREATED | RawFlags::DELETED | RawFlags::MODIFIED | RawFlags::RENAMED);
        if actions == RawFlags::CREATED
            || actions == RawFlags::DELETED
            || actions == RawFlags::MODIFIED
        {
            Some(actions)
        } else {
            None
        }
    }
}

/// Which half of a cookie-correlated rename a raw event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameSide {
    From,
    To,
}

/// One notification from a platform adapter, tagged with the subscription
/// channel it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub channel: ChannelId,
    pub path: PathBuf,
    pub flags: RawFlags,
    /// Set on inotify-style systems, where the kernel pairs the two halves of
    /// a rename with a short-lived cookie.
    pub cookie: Option<u32>,
    pub side: Option<RenameSide>,
}

impl RawEvent {
    pub fn new(channel: ChannelId, path: PathBuf, flags: RawFlags) -> Self {
        Self {
            channel,
            path,
            flags,
            cookie: None,
            side: None,
        }
    }

    pub fn moved_from(channel: ChannelId, path: PathBuf, flags: RawFlags, cookie: u32) -> Self {
        Self {
            channel,
            path,
            flags: flags | RawFlags::RENAMED,
            cookie: Some(cookie),
            side: Some(RenameSide::From),
        }
    }

    pub fn moved_to(channel: ChannelId, path: PathBuf, flags: RawFlags, cookie: u32) -> Self {
        Self {
            channel,
            path,
            flags: flags | RawFlags::RENAMED,
            cookie: Some(cookie),
            side: Some(RenameSide::To),
        }
    }

    pub fn rescan(channel: ChannelId) -> Self {
        Self {
            channel,
            path: PathBuf::new(),
            flags: RawFlags::MUST_RESCAN,
            cookie: None,
            side: None,
        }
    }

    pub fn hints(&self) -> KindHints {
        self.flags.hints()
    }
}

#[cfg(test)]
#[path = "raw_tests.rs"]
mod tests;
