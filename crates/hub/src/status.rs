// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module health snapshot for the synchronous `status()` surface.

use serde::Serialize;

/// Sizes and sticky-error states of every queue and thread, plus the hub's
/// own callback bookkeeping. `*_ok` fields hold `"ok"` or the recorded error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub pending_callback_count: usize,
    pub channel_callback_count: usize,

    pub worker_thread_ok: String,
    pub worker_in_size: usize,
    pub worker_in_ok: String,
    pub worker_out_size: usize,
    pub worker_out_ok: String,

    pub polling_thread_active: bool,
    pub polling_thread_ok: String,
    pub polling_in_size: usize,
    pub polling_out_size: usize,
}
