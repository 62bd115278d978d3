// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the treewatch workspace

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`crate::queue::MessageQueue`]. Queue errors are sticky:
/// once a queue is poisoned every later operation fails with the recorded
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Poisoned(String),
}

/// Errors raised by a backend or by the worker substrate driving it.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to watch {}: {reason}", path.display())]
    Subscription { path: PathBuf, reason: String },

    #[error("worker unavailable: {0}")]
    Unhealthy(String),
}

impl BackendError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn subscription(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Subscription {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
