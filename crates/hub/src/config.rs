// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration payloads for `configure()` and `watch()`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a logging component should write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogDisposition {
    Disabled,
    Stderr,
    Stdout,
    File(PathBuf),
}

/// How a `watch()` subscription should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchMode {
    /// Route the subscription to the polling backend instead of native
    /// notifications.
    pub poll: bool,
    pub recursive: bool,
}

/// One `configure()` call. Absent fields leave the setting untouched; host
/// bindings ignore option keys they do not recognize before building this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    pub main_log: Option<LogDisposition>,
    pub worker_log: Option<LogDisposition>,
    pub polling_log: Option<LogDisposition>,
    /// Milliseconds between polling cycles. Default 500.
    pub polling_interval_ms: Option<u64>,
    /// Work units per polling cycle. Default 1000.
    pub polling_throttle: Option<u64>,
    /// Bound on recent-file cache entries.
    pub cache_size: Option<usize>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.main_log.is_none()
            && self.worker_log.is_none()
            && self.polling_log.is_none()
            && self.polling_interval_ms.is_none()
            && self.polling_throttle.is_none()
            && self.cache_size.is_none()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
