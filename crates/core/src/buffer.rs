// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accumulation buffers for outbound messages.
//!
//! Backends collect the messages produced by one batch of raw activity in a
//! [`MessageBuffer`] and hand the whole vector to their output queue in one
//! enqueue, so consumers see batch boundaries.

use crate::command::Ack;
use crate::event::{EntryKind, FileEvent};
use crate::id::{ChannelId, CommandId};
use crate::message::Message;
use std::path::PathBuf;

/// An in-order accumulator of messages destined for an output queue.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    messages: Vec<Message>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&mut self, channel: ChannelId, path: PathBuf, kind: EntryKind) {
        self.messages
            .push(Message::Event(FileEvent::created(channel, path, kind)));
    }

    pub fn modified(&mut self, channel: ChannelId, path: PathBuf, kind: EntryKind) {
        self.messages
            .push(Message::Event(FileEvent::modified(channel, path, kind)));
    }

    pub fn deleted(&mut self, channel: ChannelId, path: PathBuf, kind: EntryKind) {
        self.messages
            .push(Message::Event(FileEvent::deleted(channel, path, kind)));
    }

    pub fn renamed(
        &mut self,
        channel: ChannelId,
        old_path: PathBuf,
        path: PathBuf,
        kind: EntryKind,
    ) {
        self.messages.push(Message::Event(FileEvent::renamed(
            channel, old_path, path, kind,
        )));
    }

    pub fn ack(&mut self, ack: Ack) {
        self.messages.push(Message::Ack(ack));
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Drain the accumulated messages, leaving the buffer reusable.
    pub fn take(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// A view over a [`MessageBuffer`] bound to one channel.
#[derive(Debug)]
pub struct ChannelMessageBuffer<'a> {
    channel: ChannelId,
    buffer: &'a mut MessageBuffer,
}

impl<'a> ChannelMessageBuffer<'a> {
    pub fn new(buffer: &'a mut MessageBuffer, channel: ChannelId) -> Self {
        Self { channel, buffer }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn created(&mut self, path: PathBuf, kind: EntryKind) {
        self.buffer.created(self.channel, path, kind);
    }

    pub fn modified(&mut self, path: PathBuf, kind: EntryKind) {
        self.buffer.modified(self.channel, path, kind);
    }

    pub fn deleted(&mut self, path: PathBuf, kind: EntryKind) {
        self.buffer.deleted(self.channel, path, kind);
    }

    pub fn renamed(&mut self, old_path: PathBuf, path: PathBuf, kind: EntryKind) {
        self.buffer.renamed(self.channel, old_path, path, kind);
    }

    /// Acknowledge a command on behalf of this channel.
    pub fn ack(&mut self, command_id: CommandId, success: bool, message: impl Into<String>) {
        self.buffer.ack(Ack {
            command_id,
            channel: Some(self.channel),
            success,
            message: message.into(),
        });
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
