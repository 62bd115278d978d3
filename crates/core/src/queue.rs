// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded cross-thread message mailbox.
//!
//! The producing thread accumulates messages through repeated calls to
//! [`MessageQueue::enqueue`] / [`MessageQueue::enqueue_all`]; the consuming
//! thread takes a whole chunk at once with [`MessageQueue::accept_all`],
//! which atomically swaps the backing buffer for an empty one. There is no
//! peek and no per-message pop.

use crate::error::QueueError;
use crate::message::Message;
use parking_lot::{Condvar, Mutex};

/// Number of messages a queue holds before producers block for backpressure.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

#[derive(Debug, Default)]
struct QueueState {
    active: Vec<Message>,
    error: Option<String>,
}

/// A mutex-protected FIFO of [`Message`]s with a single-writer/single-reader
/// contract and sticky errors.
#[derive(Debug)]
pub struct MessageQueue {
    state: Mutex<QueueState>,
    drained: Condvar,
    capacity: usize,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            drained: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append one message, blocking while the queue is at capacity.
    pub fn enqueue(&self, message: Message) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        loop {
            if let Some(error) = &state.error {
                return Err(QueueError::Poisoned(error.clone()));
            }
            if state.active.len() < self.capacity {
                state.active.push(message);
                return Ok(());
            }
            self.drained.wait(&mut state);
        }
    }

    /// Atomically append a batch of messages: consumers never observe a
    /// partial batch. Blocks until the queue is below capacity, then admits
    /// the whole batch (a single batch may overshoot the bound).
    pub fn enqueue_all(
        &self,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<(), QueueError> {
        let mut batch: Vec<Message> = messages.into_iter().collect();
        let mut state = self.state.lock();
        loop {
            if let Some(error) = &state.error {
                return Err(QueueError::Poisoned(error.clone()));
            }
            if state.active.len() < self.capacity {
                state.active.append(&mut batch);
                return Ok(());
            }
            self.drained.wait(&mut state);
        }
    }

    /// Atomically consume the current contents of the queue, emptying it.
    /// Returns `None` when no messages were present.
    pub fn accept_all(&self) -> Result<Option<Vec<Message>>, QueueError> {
        let mut state = self.state.lock();
        if let Some(error) = &state.error {
            return Err(QueueError::Poisoned(error.clone()));
        }
        if state.active.is_empty() {
            return Ok(None);
        }
        let consumed = std::mem::take(&mut state.active);
        self.drained.notify_all();
        Ok(Some(consumed))
    }

    pub fn len(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().active.is_empty()
    }

    /// The sticky error, if the queue has recorded one.
    pub fn health(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Record a sticky error. Every later operation fails with it, and any
    /// blocked producers are released.
    pub fn poison(&self, message: impl Into<String>) {
        let mut state = self.state.lock();
        if state.error.is_none() {
            state.error = Some(message.into());
        }
        self.drained.notify_all();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
