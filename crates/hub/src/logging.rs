// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log routing: one tracing subscriber, per-component destinations.
//!
//! The LOG_* commands and the `configure()` options retarget each component
//! (main, worker, polling) independently at runtime. A [`LogRouter`] installed
//! as the subscriber's writer inspects each record's target and hands back the
//! destination currently assigned to the owning component.

use crate::config::LogDisposition;
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};
use tracing_subscriber::fmt::MakeWriter;

/// The logging components the LOG_* commands address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogComponent {
    /// The hub and its event dispatcher.
    Main,
    /// The native worker.
    Worker,
    /// The polling worker.
    Polling,
}

impl LogComponent {
    /// Which component a tracing target belongs to, by crate prefix.
    pub(crate) fn of_target(target: &str) -> LogComponent {
        if target.starts_with("tw_polling") {
            LogComponent::Polling
        } else if target.starts_with("tw_native") {
            LogComponent::Worker
        } else {
            LogComponent::Main
        }
    }
}

#[derive(Clone, Default)]
enum Sink {
    #[default]
    Disabled,
    Stderr,
    Stdout,
    File(Arc<Mutex<File>>),
}

#[derive(Default)]
struct Routes {
    main: Sink,
    worker: Sink,
    polling: Sink,
}

impl Routes {
    fn get(&self, component: LogComponent) -> Sink {
        match component {
            LogComponent::Main => self.main.clone(),
            LogComponent::Worker => self.worker.clone(),
            LogComponent::Polling => self.polling.clone(),
        }
    }

    fn set(&mut self, component: LogComponent, sink: Sink) {
        match component {
            LogComponent::Main => self.main = sink,
            LogComponent::Worker => self.worker = sink,
            LogComponent::Polling => self.polling = sink,
        }
    }
}

/// Shared, runtime-retargetable writer for the tracing subscriber.
#[derive(Clone, Default)]
pub struct LogRouter {
    routes: Arc<RwLock<Routes>>,
}

impl LogRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide router every hub routes through. Destinations are
    /// global state, like the log files they point at.
    pub fn global() -> &'static LogRouter {
        static GLOBAL: OnceLock<LogRouter> = OnceLock::new();
        GLOBAL.get_or_init(LogRouter::new)
    }

    /// Point one component at a destination. Log files are opened in append
    /// mode; `Disabled` suppresses output entirely.
    pub fn set(&self, component: LogComponent, disposition: &LogDisposition) -> io::Result<()> {
        let sink = match disposition {
            LogDisposition::Disabled => Sink::Disabled,
            LogDisposition::Stderr => Sink::Stderr,
            LogDisposition::Stdout => Sink::Stdout,
            LogDisposition::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Sink::File(Arc::new(Mutex::new(file)))
            }
        };
        self.routes.write().set(component, sink);
        Ok(())
    }

    fn writer_for(&self, component: LogComponent) -> RoutedWriter {
        RoutedWriter {
            sink: self.routes.read().get(component),
        }
    }
}

/// A single-record writer resolved from the router.
pub struct RoutedWriter {
    sink: Sink,
}

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.sink {
            Sink::Disabled => Ok(buf.len()),
            Sink::Stderr => io::stderr().write(buf),
            Sink::Stdout => io::stdout().write(buf),
            Sink::File(file) => file.lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.sink {
            Sink::Disabled => Ok(()),
            Sink::Stderr => io::stderr().flush(),
            Sink::Stdout => io::stdout().flush(),
            Sink::File(file) => file.lock().flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer_for(LogComponent::Main)
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        self.writer_for(LogComponent::of_target(meta.target()))
    }
}

/// Install the global router as the process-wide subscriber. Later calls are
/// no-ops; host bindings call this once from their module initializer.
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(LogRouter::global().clone())
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
