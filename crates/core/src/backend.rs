// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contract between the worker-thread substrate and the two backends.
//!
//! A backend owns the subscriptions routed to it and turns filesystem
//! activity into normalized messages on its output sink. The substrate calls
//! [`Backend::listen`] in a loop on the worker thread; any other thread may
//! interrupt a blocked `listen` through the handle returned by
//! [`Backend::waker`], after which the substrate processes queued commands.

use crate::command::CommandOutcome;
use crate::error::{BackendError, QueueError};
use crate::id::{ChannelId, CommandId};
use crate::message::Message;
use crate::queue::MessageQueue;
use parking_lot::{Condvar, Mutex};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wakes a backend blocked in [`Backend::listen`]. Must not lose wakeups: a
/// `wake` issued while the backend is between `listen` calls makes the next
/// `listen` return promptly.
pub trait BackendWaker: Send + Sync {
    fn wake(&self) -> Result<(), BackendError>;
}

/// One event-producing backend driven by a dedicated worker thread.
pub trait Backend: Send + 'static {
    /// Handle used to interrupt `listen` from other threads. Called once per
    /// thread start, before the backend moves to the worker thread.
    fn waker(&self) -> Arc<dyn BackendWaker>;

    /// Run one blocking cycle: wait for filesystem activity or a wake, emit
    /// whatever messages resulted, then return so the substrate can process
    /// commands.
    fn listen(&mut self) -> Result<(), BackendError>;

    fn handle_add(
        &mut self,
        id: CommandId,
        channel: ChannelId,
        root: &Path,
        recursive: bool,
    ) -> Result<CommandOutcome, BackendError>;

    fn handle_remove(
        &mut self,
        id: CommandId,
        channel: ChannelId,
    ) -> Result<CommandOutcome, BackendError>;

    fn set_polling_interval(&mut self, _interval: Duration) {}

    fn set_polling_throttle(&mut self, _throttle: u64) {}

    fn set_cache_size(&mut self, _entries: usize) {}
}

/// Condvar-backed wake flag. Realizes [`BackendWaker`] for backends whose
/// `listen` is a sleep (polling, the scripted test adapter) and carries the
/// hub's "output pending" notification.
#[derive(Debug, Default)]
pub struct WakeSignal {
    woken: Mutex<bool>,
    condvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let mut woken = self.woken.lock();
        *woken = true;
        self.condvar.notify_all();
    }

    /// Block until notified, then consume the wake.
    pub fn wait(&self) {
        let mut woken = self.woken.lock();
        while !*woken {
            self.condvar.wait(&mut woken);
        }
        *woken = false;
    }

    /// Block until notified or `timeout` elapses. Returns whether a wake was
    /// consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut woken = self.woken.lock();
        while !*woken {
            if self.condvar.wait_until(&mut woken, deadline).timed_out() {
                break;
            }
        }
        std::mem::take(&mut *woken)
    }

    /// Consume a pending wake without blocking.
    pub fn take(&self) -> bool {
        std::mem::take(&mut *self.woken.lock())
    }
}

impl BackendWaker for WakeSignal {
    fn wake(&self) -> Result<(), BackendError> {
        self.notify();
        Ok(())
    }
}

/// Where a backend publishes messages: the owning worker's output queue plus
/// the hub dispatcher's wake signal.
#[derive(Clone)]
pub struct EventSink {
    queue: Arc<MessageQueue>,
    signal: Arc<WakeSignal>,
}

impl EventSink {
    pub fn new(queue: Arc<MessageQueue>, signal: Arc<WakeSignal>) -> Self {
        Self { queue, signal }
    }

    pub fn emit(&self, message: Message) -> Result<(), QueueError> {
        self.queue.enqueue(message)?;
        self.signal.notify();
        Ok(())
    }

    /// Enqueue a batch and notify the hub once. A no-op for an empty batch.
    pub fn emit_all(&self, messages: Vec<Message>) -> Result<(), QueueError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.queue.enqueue_all(messages)?;
        self.signal.notify();
        Ok(())
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
