// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel and command identifier types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for one active subscription channel.
///
/// Channel ids are allocated by the hub, start at 1, and strictly increase
/// over the lifetime of the process. Zero is the reserved null channel used
/// by acks that do not refer to a subscription.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ChannelId(pub u32);

impl ChannelId {
    pub const NULL: ChannelId = ChannelId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one in-flight command.
///
/// Command ids are allocated by the hub alongside channel ids and strictly
/// increase. Zero is reserved; a polled root whose pending id has been
/// consumed holds the null id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct CommandId(pub u64);

impl CommandId {
    pub const NULL: CommandId = CommandId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
