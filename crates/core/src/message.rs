// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged message payloads exchanged over worker queues

use crate::command::{Ack, Command};
use crate::event::FileEvent;
use serde::{Deserialize, Serialize};

/// A single unit of cross-thread traffic: a normalized filesystem event, a
/// command, or an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Event(FileEvent),
    Command(Command),
    Ack(Ack),
}

impl Message {
    pub fn as_event(&self) -> Option<&FileEvent> {
        match self {
            Message::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Message::Command(command) => Some(command),
            _ => None,
        }
    }

    pub fn as_ack(&self) -> Option<&Ack> {
        match self {
            Message::Ack(ack) => Some(ack),
            _ => None,
        }
    }
}

impl From<FileEvent> for Message {
    fn from(event: FileEvent) -> Self {
        Message::Event(event)
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}

impl From<Ack> for Message {
    fn from(ack: Ack) -> Self {
        Message::Ack(ack)
    }
}
