// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A one-shot counted barrier over several acknowledgements.
//!
//! `unwatch` and `configure` fan a command out to both workers but owe the
//! caller a single callback: each child decrements the counter, and the
//! parent fires exactly once when it reaches zero, with the first error
//! observed.

use crate::error::AckError;
use parking_lot::Mutex;
use std::sync::Arc;

type ParentCallback = Box<dyn FnOnce(Result<(), AckError>) + Send>;

struct AllState {
    remaining: usize,
    first_error: Option<AckError>,
    parent: Option<ParentCallback>,
}

/// Join over `count` child callbacks.
#[derive(Clone)]
pub struct AllCallback {
    state: Arc<Mutex<AllState>>,
}

impl AllCallback {
    /// A barrier of `count` children. With zero children the parent fires
    /// immediately with success.
    pub fn new(count: usize, parent: ParentCallback) -> Self {
        if count == 0 {
            parent(Ok(()));
            return Self {
                state: Arc::new(Mutex::new(AllState {
                    remaining: 0,
                    first_error: None,
                    parent: None,
                })),
            };
        }
        Self {
            state: Arc::new(Mutex::new(AllState {
                remaining: count,
                first_error: None,
                parent: Some(parent),
            })),
        }
    }

    /// One child's completion slot. Call each slot exactly once.
    pub fn child(&self) -> impl FnOnce(Result<(), AckError>) + Send {
        let state = Arc::clone(&self.state);
        move |result| {
            let parent = {
                let mut state = state.lock();
                if let Err(error) = result {
                    state.first_error.get_or_insert(error);
                }
                if state.remaining == 0 {
                    return;
                }
                state.remaining -= 1;
                if state.remaining == 0 {
                    state.parent.take().map(|parent| {
                        let outcome = match state.first_error.take() {
                            Some(error) => Err(error),
                            None => Ok(()),
                        };
                        (parent, outcome)
                    })
                } else {
                    None
                }
            };
            if let Some((parent, outcome)) = parent {
                parent(outcome);
            }
        }
    }
}

#[cfg(test)]
#[path = "all_callback_tests.rs"]
mod tests;
