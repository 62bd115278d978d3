// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the hub surface

use thiserror::Error;
use tw_core::{BackendError, QueueError};

/// Errors returned synchronously by hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("worker unavailable: {0}")]
    Unhealthy(String),

    #[error("unable to start the {label} thread: {source}")]
    Spawn {
        label: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to open log file: {0}")]
    LogFile(std::io::Error),
}

/// A command that completed unsuccessfully, as delivered to ack callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AckError {
    pub message: String,
}

impl AckError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
