// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command, acknowledgement, and handler-outcome payloads

use crate::id::{ChannelId, CommandId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verb carried by a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CommandAction {
    /// Subscribe a channel to a directory tree.
    Add {
        channel: ChannelId,
        root: PathBuf,
        recursive: bool,
    },
    /// Tear down a channel's subscription.
    Remove { channel: ChannelId },
    /// Redirect this worker's log output to a file.
    LogFile { path: PathBuf },
    LogStderr,
    LogStdout,
    LogDisable,
    /// Change the delay between polling cycles.
    PollingInterval { ms: u64 },
    /// Change the work-unit budget of a polling cycle.
    PollingThrottle { amount: u64 },
    /// Resize the recent-file cache.
    CacheSize { entries: usize },
    /// Emitted by a stopped worker that holds dead letters; asks the hub to
    /// replay them.
    Drain,
}

/// One command in flight between the hub and a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub action: CommandAction,
}

impl Command {
    pub fn new(id: CommandId, action: CommandAction) -> Self {
        Self { id, action }
    }

    /// The channel this command refers to, if any.
    pub fn channel(&self) -> Option<ChannelId> {
        match &self.action {
            CommandAction::Add { channel, .. } | CommandAction::Remove { channel } => {
                Some(*channel)
            }
            _ => None,
        }
    }

    /// Whether receipt of this command should start a stopped worker.
    pub fn triggers_run(&self) -> bool {
        matches!(self.action, CommandAction::Add { .. })
    }
}

/// Acknowledgement of one command. `message` is non-empty exactly when the
/// command could not be serviced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub command_id: CommandId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelId>,
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn success(command: &Command) -> Self {
        Self {
            command_id: command.id,
            channel: command.channel(),
            success: true,
            message: String::new(),
        }
    }

    pub fn failure(command: &Command, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message.push_str("command failed");
        }
        Self {
            command_id: command.id,
            channel: command.channel(),
            success: false,
            message,
        }
    }
}

/// What a command handler instructs the worker loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Emit an ack for this command now. Handlers that ack later (the polling
    /// backend acks an Add once its first traversal completes) clear this.
    pub ack: bool,
    pub success: bool,
    /// Route further input to the dead-letter office and stop the worker once
    /// the current batch is done.
    pub should_stop: bool,
}

impl CommandOutcome {
    /// Ack immediately with success.
    pub fn acked() -> Self {
        Self {
            ack: true,
            success: true,
            should_stop: false,
        }
    }

    /// Ack later, through some other path.
    pub fn deferred() -> Self {
        Self {
            ack: false,
            success: true,
            should_stop: false,
        }
    }

    pub fn with_stop(mut self, should_stop: bool) -> Self {
        self.should_stop = should_stop;
        self
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
