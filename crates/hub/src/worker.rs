// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker-thread substrate shared by both backends.
//!
//! A [`WorkerThread`] owns the input/output queues, the lifecycle state
//! machine, and the dead-letter office. The backend only sees its own
//! contract: `listen` in a loop, command handlers on demand. Command dispatch
//! is table-driven on the action; handler errors become failed acks and the
//! thread stays healthy.

use crate::config::LogDisposition;
use crate::error::HubError;
use crate::logging::{LogComponent, LogRouter};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tw_core::{
    Ack, Backend, BackendError, BackendWaker, Command, CommandAction, CommandId, CommandOutcome,
    EventSink, Message, MessageBuffer, MessageQueue, QueueError, WakeSignal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

pub(crate) struct WorkerShared {
    input: Arc<MessageQueue>,
    output: Arc<MessageQueue>,
    state: Mutex<WorkerState>,
    dead_letters: Mutex<Vec<Message>>,
    error: Mutex<Option<String>>,
}

impl WorkerShared {
    fn new() -> Self {
        Self {
            input: Arc::new(MessageQueue::new()),
            output: Arc::new(MessageQueue::new()),
            state: Mutex::new(WorkerState::Stopped),
            dead_letters: Mutex::new(Vec::new()),
            error: Mutex::new(None),
        }
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock() = state;
    }

    fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Record a sticky thread-health error. The first one wins.
    fn record_error(&self, message: impl Into<String>) {
        let mut error = self.error.lock();
        if error.is_none() {
            *error = Some(message.into());
        }
    }

    fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }
}

/// A background worker driving one [`Backend`].
pub struct WorkerThread<B: Backend> {
    label: &'static str,
    component: LogComponent,
    shared: Arc<WorkerShared>,
    factory: Box<dyn Fn(EventSink) -> Result<B, BackendError> + Send + Sync>,
    /// Signal shared with the hub dispatcher; every output enqueue pokes it.
    dispatch_signal: Arc<WakeSignal>,
    router: LogRouter,
    waker: Mutex<Option<Arc<dyn BackendWaker>>>,
    join: Mutex<Option<JoinHandle<()>>>,
    /// Serializes senders so the state check and the enqueue stay coherent.
    send_lock: Mutex<()>,
}

impl<B: Backend> WorkerThread<B> {
    pub fn new(
        label: &'static str,
        component: LogComponent,
        router: LogRouter,
        dispatch_signal: Arc<WakeSignal>,
        factory: impl Fn(EventSink) -> Result<B, BackendError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label,
            component,
            shared: Arc::new(WorkerShared::new()),
            factory: Box::new(factory),
            dispatch_signal,
            router,
            waker: Mutex::new(None),
            join: Mutex::new(None),
            send_lock: Mutex::new(()),
        }
    }

    fn sink(&self) -> EventSink {
        EventSink::new(
            Arc::clone(&self.shared.output),
            Arc::clone(&self.dispatch_signal),
        )
    }

    /// Spawn (or respawn) the worker thread. Fails sticky if the backend
    /// cannot be constructed.
    pub fn start(&self) -> Result<(), HubError> {
        if let Some(handle) = self.join.lock().take() {
            let _ = handle.join();
        }
        self.shared.set_state(WorkerState::Starting);

        let backend = match (self.factory)(self.sink()) {
            Ok(backend) => backend,
            Err(err) => {
                let message = err.to_string();
                self.shared.record_error(&message);
                self.shared.set_state(WorkerState::Stopped);
                return Err(HubError::Unhealthy(message));
            }
        };
        *self.waker.lock() = Some(backend.waker());

        let shared = Arc::clone(&self.shared);
        let sink = self.sink();
        let router = self.router.clone();
        let component = self.component;
        let label = self.label;
        let handle = std::thread::Builder::new()
            .name(label.to_string())
            .spawn(move || run_worker(backend, shared, sink, router, component, label))
            .map_err(|source| HubError::Spawn { label, source })?;
        *self.join.lock() = Some(handle);
        Ok(())
    }

    /// Route one message to the worker. Returns `true` when the send
    /// triggered a restart (the caller should drain output soon, since dead
    /// letters may have produced acks).
    pub fn send(&self, message: Message) -> Result<bool, HubError> {
        let _guard = self.send_lock.lock();
        if let Some(error) = self.shared.error() {
            return Err(HubError::Unhealthy(error));
        }

        let state = self.shared.state();
        match state {
            WorkerState::Running | WorkerState::Starting => {
                self.shared.input.enqueue(message)?;
                self.wake()?;
                Ok(false)
            }
            WorkerState::Stopping => {
                self.shared.dead_letters.lock().push(message);
                Ok(false)
            }
            WorkerState::Stopped => {
                let mut queued: Vec<Message> =
                    self.shared.dead_letters.lock().drain(..).collect();
                queued.push(message);
                let trigger = queued
                    .iter()
                    .any(|m| m.as_command().is_some_and(Command::triggers_run));

                if trigger {
                    self.shared.input.enqueue_all(queued)?;
                    self.start()?;
                    self.wake()?;
                    return Ok(true);
                }

                // Nothing will run these commands soon; ack them now so the
                // caller is not left waiting on a thread that has no reason
                // to start. Settings are stashed (with the null id, so the
                // replay stays silent) and applied at the next start.
                let mut acks = MessageBuffer::new();
                let mut stashed = Vec::new();
                for message in queued {
                    match message {
                        Message::Command(command) => {
                            if !command.id.is_null() {
                                acks.ack(Ack::success(&command));
                            }
                            if is_replayable_setting(&command.action) {
                                stashed.push(Message::Command(Command::new(
                                    CommandId::NULL,
                                    command.action,
                                )));
                            }
                        }
                        other => {
                            tracing::debug!(
                                ?other,
                                "dropping non-command message sent to a stopped worker"
                            );
                        }
                    }
                }
                *self.shared.dead_letters.lock() = stashed;
                self.sink().emit_all(acks.take())?;
                Ok(false)
            }
        }
    }

    /// Replay the dead-letter office. Returns `true` when the replay
    /// restarted the thread.
    pub fn drain(&self) -> Result<bool, HubError> {
        let letters: Vec<Message> = self.shared.dead_letters.lock().drain(..).collect();
        let mut restarted = false;
        for message in letters {
            restarted |= self.send(message)?;
        }
        Ok(restarted)
    }

    /// Consume everything currently on the output queue.
    pub fn receive_all(&self) -> Result<Option<Vec<Message>>, QueueError> {
        self.shared.output.accept_all()
    }

    /// Ask a running worker to wind down and wait for it.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state != WorkerState::Stopped {
                *state = WorkerState::Stopping;
            }
        }
        let _ = self.wake();
        if let Some(handle) = self.join.lock().take() {
            let _ = handle.join();
        }
    }

    fn wake(&self) -> Result<(), HubError> {
        if let Some(waker) = self.waker.lock().as_ref() {
            waker.wake()?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.shared.state(),
            WorkerState::Running | WorkerState::Starting
        )
    }

    /// "ok", or the sticky error that took the thread down.
    pub fn thread_ok(&self) -> String {
        self.shared.error().unwrap_or_else(|| "ok".to_string())
    }

    pub fn in_size(&self) -> usize {
        self.shared.input.len()
    }

    pub fn in_ok(&self) -> String {
        self.shared.input.health().unwrap_or_else(|| "ok".to_string())
    }

    pub fn out_size(&self) -> usize {
        self.shared.output.len()
    }

    pub fn out_ok(&self) -> String {
        self.shared
            .output
            .health()
            .unwrap_or_else(|| "ok".to_string())
    }
}

fn run_worker<B: Backend>(
    mut backend: B,
    shared: Arc<WorkerShared>,
    sink: EventSink,
    router: LogRouter,
    component: LogComponent,
    label: &'static str,
) {
    tracing::debug!(thread = label, "worker thread running");
    {
        let mut state = shared.state.lock();
        if *state == WorkerState::Starting {
            *state = WorkerState::Running;
        }
    }

    loop {
        match handle_command_batch(&mut backend, &shared, &sink, &router, component) {
            Ok(()) => {}
            Err(err) => {
                shared.record_error(err.to_string());
                break;
            }
        }

        if shared.state() == WorkerState::Stopping && shared.input.is_empty() {
            break;
        }

        if let Err(err) = backend.listen() {
            tracing::error!(thread = label, error = %err, "listen failed, stopping worker");
            shared.record_error(err.to_string());
            break;
        }
    }

    // Anything still queued waits in the dead-letter office for a restart.
    if let Ok(Some(leftover)) = shared.input.accept_all() {
        shared.dead_letters.lock().extend(leftover);
    }
    let has_dead_letters = !shared.dead_letters.lock().is_empty();
    if has_dead_letters {
        let drain = Message::Command(Command::new(CommandId::NULL, CommandAction::Drain));
        if let Err(err) = sink.emit(drain) {
            tracing::warn!(thread = label, error = %err, "unable to announce dead letters");
        }
    }

    shared.set_state(WorkerState::Stopped);
    tracing::debug!(thread = label, "worker thread stopped");
}

fn handle_command_batch<B: Backend>(
    backend: &mut B,
    shared: &WorkerShared,
    sink: &EventSink,
    router: &LogRouter,
    component: LogComponent,
) -> Result<(), QueueError> {
    let Some(accepted) = shared.input.accept_all()? else {
        return Ok(());
    };

    let mut acks = MessageBuffer::new();
    let mut should_stop = false;

    for message in accepted {
        let Message::Command(command) = message else {
            tracing::warn!(?message, "unexpected non-command message on the input queue");
            continue;
        };

        let (outcome, error) = match dispatch_command(backend, &command, router, component) {
            Ok(outcome) => (outcome, None),
            Err(err) => {
                tracing::warn!(command = %command.id, error = %err, "command handler failed");
                (
                    CommandOutcome {
                        ack: true,
                        success: false,
                        should_stop: false,
                    },
                    Some(err.to_string()),
                )
            }
        };

        // Null-id commands are internal setting replays; nobody is waiting
        // on them.
        if outcome.ack && !command.id.is_null() {
            let ack = if outcome.success {
                Ack::success(&command)
            } else {
                Ack::failure(&command, error.unwrap_or_default())
            };
            acks.ack(ack);
        }
        should_stop = should_stop || outcome.should_stop;
    }

    sink.emit_all(acks.take())?;

    if should_stop {
        shared.set_state(WorkerState::Stopping);
        // Input that arrived behind this batch belongs to the next
        // incarnation.
        if let Some(rest) = shared.input.accept_all()? {
            shared.dead_letters.lock().extend(rest);
        }
    }

    Ok(())
}

fn dispatch_command<B: Backend>(
    backend: &mut B,
    command: &Command,
    router: &LogRouter,
    component: LogComponent,
) -> Result<CommandOutcome, BackendError> {
    match &command.action {
        CommandAction::Add {
            channel,
            root,
            recursive,
        } => backend.handle_add(command.id, *channel, root, *recursive),
        CommandAction::Remove { channel } => backend.handle_remove(command.id, *channel),
        CommandAction::LogFile { path } => {
            set_log(router, component, &LogDisposition::File(path.clone()))
        }
        CommandAction::LogStderr => set_log(router, component, &LogDisposition::Stderr),
        CommandAction::LogStdout => set_log(router, component, &LogDisposition::Stdout),
        CommandAction::LogDisable => set_log(router, component, &LogDisposition::Disabled),
        CommandAction::PollingInterval { ms } => {
            backend.set_polling_interval(Duration::from_millis(*ms));
            Ok(CommandOutcome::acked())
        }
        CommandAction::PollingThrottle { amount } => {
            backend.set_polling_throttle(*amount);
            Ok(CommandOutcome::acked())
        }
        CommandAction::CacheSize { entries } => {
            backend.set_cache_size(*entries);
            Ok(CommandOutcome::acked())
        }
        CommandAction::Drain => {
            tracing::warn!(command = %command.id, "unexpected command action");
            Ok(CommandOutcome::acked())
        }
    }
}

/// Settings a stopped worker must not lose: they are re-applied, silently,
/// when the thread next starts.
fn is_replayable_setting(action: &CommandAction) -> bool {
    matches!(
        action,
        CommandAction::LogFile { .. }
            | CommandAction::LogStderr
            | CommandAction::LogStdout
            | CommandAction::LogDisable
            | CommandAction::PollingInterval { .. }
            | CommandAction::PollingThrottle { .. }
            | CommandAction::CacheSize { .. }
    )
}

fn set_log(
    router: &LogRouter,
    component: LogComponent,
    disposition: &LogDisposition,
) -> Result<CommandOutcome, BackendError> {
    router
        .set(component, disposition)
        .map_err(|err| BackendError::io("unable to retarget log output", err))?;
    Ok(CommandOutcome::acked())
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
