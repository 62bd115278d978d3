// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![feature(io_error_more)]

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tw-core: payload types, queues, and the backend contract shared by the
//! treewatch workspace

pub mod backend;
pub mod buffer;
pub mod command;
pub mod error;
pub mod event;
pub mod id;
pub mod message;
pub mod queue;
pub mod snapshot;

pub use backend::{Backend, BackendWaker, EventSink, WakeSignal};
pub use buffer::{ChannelMessageBuffer, MessageBuffer};
pub use command::{Ack, Command, CommandAction, CommandOutcome};
pub use error::{BackendError, QueueError};
pub use event::{Action, EntryKind, FileEvent};
pub use id::{ChannelId, CommandId};
pub use message::Message;
pub use queue::{MessageQueue, DEFAULT_QUEUE_CAPACITY};
pub use snapshot::{KindHints, StatSnapshot};
