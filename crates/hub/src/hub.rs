// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The hub: id allocation, command routing, and event fan-out.
//!
//! The hub is the only allocator of channel and command ids, both strictly
//! increasing for the life of the process. Commands are stamped and routed to
//! one worker's input queue; a dedicated dispatcher thread drains both
//! workers' output queues, resolves acks against the pending-callback table,
//! and delivers events grouped per channel.

use crate::all_callback::AllCallback;
use crate::config::{ConfigUpdate, WatchMode};
use crate::error::{AckError, HubError};
use crate::logging::{LogComponent, LogRouter};
use crate::status::StatusReport;
use crate::worker::WorkerThread;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tw_core::{
    Ack, Backend, BackendError, ChannelId, Command, CommandAction, CommandId, EventSink,
    FileEvent, Message, WakeSignal,
};
use tw_native::{NativeAdapter, NativeBackend};
use tw_polling::PollingBackend;

#[cfg(target_os = "linux")]
pub type PlatformAdapter = tw_native::InotifyAdapter;

#[cfg(not(target_os = "linux"))]
pub type PlatformAdapter = tw_native::UnsupportedAdapter;

type PendingAck = Box<dyn FnOnce(&Ack) + Send>;
type EventCallback = Arc<Mutex<Box<dyn FnMut(&[FileEvent]) + Send>>>;

#[derive(Default)]
struct HubState {
    next_command_id: u64,
    next_channel_id: u32,
    pending: HashMap<CommandId, PendingAck>,
    channels: HashMap<ChannelId, EventCallback>,
}

impl HubState {
    fn next_channel(&mut self) -> ChannelId {
        self.next_channel_id += 1;
        ChannelId(self.next_channel_id)
    }

    fn next_command(&mut self) -> CommandId {
        self.next_command_id += 1;
        CommandId(self.next_command_id)
    }
}

/// The process-wide watcher front end. Host bindings hold exactly one.
pub struct Hub<A: NativeAdapter = PlatformAdapter> {
    state: Arc<Mutex<HubState>>,
    native: Arc<WorkerThread<NativeBackend<A>>>,
    polling: Arc<WorkerThread<PollingBackend>>,
    router: LogRouter,
    dispatch_signal: Arc<WakeSignal>,
    dispatcher_running: Arc<AtomicBool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    /// Serializes drains so concurrent `handle_events` calls cannot reorder a
    /// channel's batches.
    drain_lock: Arc<Mutex<()>>,
}

impl Hub<PlatformAdapter> {
    /// A hub backed by this platform's native adapter. The native worker
    /// starts eagerly; the polling worker starts on its first subscription.
    pub fn new() -> Result<Self, HubError> {
        Self::with_adapter_factory(PlatformAdapter::new)
    }
}

impl<A: NativeAdapter> Hub<A> {
    /// A hub whose native worker builds its adapter with `adapter_factory`.
    /// The factory runs once per thread (re)start.
    pub fn with_adapter_factory(
        adapter_factory: impl Fn() -> Result<A, BackendError> + Send + Sync + 'static,
    ) -> Result<Self, HubError> {
        let router = LogRouter::global().clone();
        let dispatch_signal = Arc::new(WakeSignal::new());

        let native = Arc::new(WorkerThread::new(
            "treewatch-worker",
            LogComponent::Worker,
            router.clone(),
            Arc::clone(&dispatch_signal),
            move |sink: EventSink| Ok(NativeBackend::new(adapter_factory()?, sink)),
        ));
        let polling = Arc::new(WorkerThread::new(
            "treewatch-polling",
            LogComponent::Polling,
            router.clone(),
            Arc::clone(&dispatch_signal),
            |sink: EventSink| Ok(PollingBackend::new(sink)),
        ));

        let hub = Self {
            state: Arc::new(Mutex::new(HubState::default())),
            native,
            polling,
            router,
            dispatch_signal,
            dispatcher_running: Arc::new(AtomicBool::new(true)),
            dispatcher: Mutex::new(None),
            drain_lock: Arc::new(Mutex::new(())),
        };

        hub.native.start()?;
        hub.spawn_dispatcher()?;
        Ok(hub)
    }

    fn spawn_dispatcher(&self) -> Result<(), HubError> {
        let state = Arc::clone(&self.state);
        let native = Arc::clone(&self.native);
        let polling = Arc::clone(&self.polling);
        let signal = Arc::clone(&self.dispatch_signal);
        let running = Arc::clone(&self.dispatcher_running);
        let drain_lock = Arc::clone(&self.drain_lock);

        let handle = std::thread::Builder::new()
            .name("treewatch-hub".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    signal.wait();
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let _guard = drain_lock.lock();
                    drain_worker(&state, &native);
                    drain_worker(&state, &polling);
                }
            })
            .map_err(|source| HubError::Spawn {
                label: "treewatch-hub",
                source,
            })?;
        *self.dispatcher.lock() = Some(handle);
        Ok(())
    }

    /// Subscribe to `root`. The returned channel id is final; `ack` fires
    /// once the owning backend has registered (or failed to register) the
    /// subscription, and `events` receives every batch for the channel from
    /// then on.
    pub fn watch(
        &self,
        root: impl Into<PathBuf>,
        mode: WatchMode,
        ack: impl FnOnce(Result<ChannelId, AckError>) + Send + 'static,
        events: impl FnMut(&[FileEvent]) + Send + 'static,
    ) -> Result<ChannelId, HubError> {
        let root = root.into();
        let (channel, command_id) = {
            let mut state = self.state.lock();
            let channel = state.next_channel();
            let command_id = state.next_command();
            let callback: EventCallback = Arc::new(Mutex::new(Box::new(events)));
            state.channels.insert(channel, callback);
            state.pending.insert(
                command_id,
                Box::new(move |response: &Ack| {
                    if response.success {
                        ack(Ok(channel));
                    } else {
                        ack(Err(AckError::new(response.message.clone())));
                    }
                }),
            );
            (channel, command_id)
        };

        let command = Message::Command(Command::new(
            command_id,
            CommandAction::Add {
                channel,
                root,
                recursive: mode.recursive,
            },
        ));
        let sent = if mode.poll {
            self.polling.send(command)
        } else {
            self.native.send(command)
        };

        if let Err(err) = sent {
            let mut state = self.state.lock();
            state.pending.remove(&command_id);
            state.channels.remove(&channel);
            return Err(err);
        }
        Ok(channel)
    }

    /// Tear down a channel. The subscription may live on either backend (or
    /// neither), so REMOVE goes to both and `ack` fires once both answered.
    pub fn unwatch(
        &self,
        channel: ChannelId,
        ack: impl FnOnce(Result<(), AckError>) + Send + 'static,
    ) -> Result<(), HubError> {
        if self.state.lock().channels.remove(&channel).is_none() {
            tracing::debug!(channel = %channel, "channel already has no event callback");
        }

        let all = AllCallback::new(2, Box::new(ack));
        let native_child = all.child();
        let polling_child = all.child();
        self.send_command(
            &self.native,
            CommandAction::Remove { channel },
            move |response| native_child(ack_result(response)),
        )?;
        self.send_command(
            &self.polling,
            CommandAction::Remove { channel },
            move |response| polling_child(ack_result(response)),
        )?;
        Ok(())
    }

    /// Apply logging and tuning changes. The main log retargets
    /// synchronously; everything else is forwarded to the owning worker, and
    /// `ack` fires once every forwarded command has been acknowledged.
    pub fn configure(
        &self,
        update: ConfigUpdate,
        ack: impl FnOnce(Result<(), AckError>) + Send + 'static,
    ) -> Result<(), HubError> {
        if let Some(disposition) = &update.main_log {
            self.router
                .set(LogComponent::Main, disposition)
                .map_err(HubError::LogFile)?;
        }

        let mut native_actions = Vec::new();
        let mut polling_actions = Vec::new();

        if let Some(disposition) = &update.worker_log {
            native_actions.push(log_action(disposition));
        }
        if let Some(entries) = update.cache_size {
            native_actions.push(CommandAction::CacheSize { entries });
        }
        if let Some(disposition) = &update.polling_log {
            polling_actions.push(log_action(disposition));
        }
        if let Some(ms) = update.polling_interval_ms {
            polling_actions.push(CommandAction::PollingInterval { ms });
        }
        if let Some(amount) = update.polling_throttle {
            polling_actions.push(CommandAction::PollingThrottle { amount });
        }

        let all = AllCallback::new(native_actions.len() + polling_actions.len(), Box::new(ack));
        for action in native_actions {
            let child = all.child();
            self.send_command(&self.native, action, move |response| {
                child(ack_result(response))
            })?;
        }
        for action in polling_actions {
            let child = all.child();
            self.send_command(&self.polling, action, move |response| {
                child(ack_result(response))
            })?;
        }
        Ok(())
    }

    /// Synchronous health snapshot.
    pub fn status(&self) -> StatusReport {
        let (pending, channels) = {
            let state = self.state.lock();
            (state.pending.len(), state.channels.len())
        };
        StatusReport {
            pending_callback_count: pending,
            channel_callback_count: channels,
            worker_thread_ok: self.native.thread_ok(),
            worker_in_size: self.native.in_size(),
            worker_in_ok: self.native.in_ok(),
            worker_out_size: self.native.out_size(),
            worker_out_ok: self.native.out_ok(),
            polling_thread_active: self.polling.is_active(),
            polling_thread_ok: self.polling.thread_ok(),
            polling_in_size: self.polling.in_size(),
            polling_out_size: self.polling.out_size(),
        }
    }

    /// Drain both workers' output queues on the calling thread. The
    /// dispatcher thread does this on every signal; hosts that need
    /// deterministic delivery points may call it directly as well.
    pub fn handle_events(&self) {
        let _guard = self.drain_lock.lock();
        drain_worker(&self.state, &self.native);
        drain_worker(&self.state, &self.polling);
    }

    fn send_command<B: Backend>(
        &self,
        worker: &Arc<WorkerThread<B>>,
        action: CommandAction,
        on_ack: impl FnOnce(&Ack) + Send + 'static,
    ) -> Result<(), HubError> {
        let command_id = {
            let mut state = self.state.lock();
            let command_id = state.next_command();
            state.pending.insert(command_id, Box::new(on_ack));
            command_id
        };

        match worker.send(Message::Command(Command::new(command_id, action))) {
            Ok(_restarted) => Ok(()),
            Err(err) => {
                // The command will never be handled; fail its ack now so the
                // caller still hears back exactly once.
                let callback = self.state.lock().pending.remove(&command_id);
                if let Some(callback) = callback {
                    callback(&Ack {
                        command_id,
                        channel: None,
                        success: false,
                        message: err.to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

impl<A: NativeAdapter> Drop for Hub<A> {
    fn drop(&mut self) {
        self.native.shutdown();
        self.polling.shutdown();
        self.dispatcher_running.store(false, Ordering::SeqCst);
        self.dispatch_signal.notify();
        if let Some(handle) = self.dispatcher.lock().take() {
            let _ = handle.join();
        }
    }
}

fn ack_result(ack: &Ack) -> Result<(), AckError> {
    if ack.success {
        Ok(())
    } else {
        Err(AckError::new(ack.message.clone()))
    }
}

fn log_action(disposition: &crate::config::LogDisposition) -> CommandAction {
    use crate::config::LogDisposition;
    match disposition {
        LogDisposition::Disabled => CommandAction::LogDisable,
        LogDisposition::Stderr => CommandAction::LogStderr,
        LogDisposition::Stdout => CommandAction::LogStdout,
        LogDisposition::File(path) => CommandAction::LogFile { path: path.clone() },
    }
}

fn drain_worker<B: Backend>(state: &Arc<Mutex<HubState>>, worker: &Arc<WorkerThread<B>>) {
    let messages = match worker.receive_all() {
        Ok(Some(messages)) => messages,
        Ok(None) => return,
        Err(err) => {
            tracing::warn!(error = %err, "unable to receive messages from worker");
            return;
        }
    };

    let mut to_deliver: BTreeMap<ChannelId, Vec<FileEvent>> = BTreeMap::new();

    for message in messages {
        match message {
            Message::Ack(ack) => {
                let callback = state.lock().pending.remove(&ack.command_id);
                match callback {
                    Some(callback) => callback(&ack),
                    None => {
                        tracing::debug!(command = %ack.command_id, "ignoring unexpected ack");
                    }
                }
            }
            Message::Event(event) => {
                to_deliver.entry(event.channel).or_default().push(event);
            }
            Message::Command(command) => match command.action {
                CommandAction::Drain => match worker.drain() {
                    Ok(_restarted) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "unable to drain the dead-letter office");
                    }
                },
                _ => {
                    tracing::debug!(command = %command.id, "ignoring unexpected command");
                }
            },
        }
    }

    for (channel, events) in to_deliver {
        let callback = state.lock().channels.get(&channel).cloned();
        match callback {
            Some(callback) => {
                tracing::trace!(channel = %channel, count = events.len(), "delivering events");
                (callback.lock())(&events);
            }
            None => {
                tracing::debug!(channel = %channel, "dropping events for an unknown channel");
            }
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
