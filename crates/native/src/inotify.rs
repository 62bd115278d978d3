// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linux adapter: inotify behind a mio poll loop.
//!
//! One watch descriptor per directory. Recursive roots register the whole
//! tree up front; directories created later are added through
//! [`NativeAdapter::track_subdirectory`]. A mio `Waker` realizes the
//! lost-wakeup-free `wake` contract.

use crate::adapter::{NativeAdapter, RenameStyle};
use crate::raw::{RawEvent, RawFlags};
use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tw_core::{BackendError, BackendWaker, ChannelId};
use walkdir::WalkDir;

const WAKE: Token = Token(0);
const INOTIFY: Token = Token(1);

const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug)]
struct WatchEntry {
    channel: ChannelId,
    path: PathBuf,
}

struct MioWaker(Waker);

impl BackendWaker for MioWaker {
    fn wake(&self) -> Result<(), BackendError> {
        self.0
            .wake()
            .map_err(|err| BackendError::io("unable to wake the native worker", err))
    }
}

/// inotify-backed [`NativeAdapter`].
pub struct InotifyAdapter {
    inotify: Inotify,
    poll: Poll,
    events: Events,
    waker: Arc<MioWaker>,
    read_buffer: Vec<u8>,
    watches: HashMap<WatchDescriptor, WatchEntry>,
    by_channel: HashMap<ChannelId, Vec<WatchDescriptor>>,
}

impl InotifyAdapter {
    pub fn new() -> Result<Self, BackendError> {
        let inotify =
            Inotify::init().map_err(|err| BackendError::io("unable to initialize inotify", err))?;
        let poll =
            Poll::new().map_err(|err| BackendError::io("unable to create a poll handle", err))?;
        let waker = Waker::new(poll.registry(), WAKE)
            .map_err(|err| BackendError::io("unable to create a waker", err))?;
        let fd = inotify.as_raw_fd();
        poll.registry()
            .register(&mut SourceFd(&fd), INOTIFY, Interest::READABLE)
            .map_err(|err| BackendError::io("unable to register the inotify descriptor", err))?;

        Ok(Self {
            inotify,
            poll,
            events: Events::with_capacity(16),
            waker: Arc::new(MioWaker(waker)),
            read_buffer: vec![0u8; READ_BUFFER_SIZE],
            watches: HashMap::new(),
            by_channel: HashMap::new(),
        })
    }

    fn watch_mask(recursive: bool) -> WatchMask {
        let mut mask = WatchMask::ATTRIB
            | WatchMask::CREATE
            | WatchMask::DELETE
            | WatchMask::DELETE_SELF
            | WatchMask::MODIFY
            | WatchMask::MOVE_SELF
            | WatchMask::MOVED_FROM
            | WatchMask::MOVED_TO
            | WatchMask::DONT_FOLLOW
            | WatchMask::EXCL_UNLINK;
        if recursive {
            mask |= WatchMask::ONLYDIR;
        }
        mask
    }

    fn add_tree(
        &mut self,
        channel: ChannelId,
        root: &Path,
        recursive: bool,
    ) -> Result<(), BackendError> {
        let wd = self
            .inotify
            .watches()
            .add(root, Self::watch_mask(recursive))
            .map_err(|err| BackendError::subscription(root, err.to_string()))?;
        tracing::debug!(channel = %channel, path = %root.display(), "watching directory");
        self.watches.insert(
            wd.clone(),
            WatchEntry {
                channel,
                path: root.to_path_buf(),
            },
        );
        self.by_channel.entry(channel).or_default().push(wd);

        if recursive {
            let subdirectories = WalkDir::new(root)
                .min_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_dir());
            for entry in subdirectories {
                let path = entry.path();
                match self.inotify.watches().add(path, Self::watch_mask(true)) {
                    Ok(wd) => {
                        self.watches.insert(
                            wd.clone(),
                            WatchEntry {
                                channel,
                                path: path.to_path_buf(),
                            },
                        );
                        self.by_channel.entry(channel).or_default().push(wd);
                    }
                    Err(err) => {
                        tracing::debug!(
                            path = %path.display(),
                            error = %err,
                            "unable to watch subdirectory"
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

impl NativeAdapter for InotifyAdapter {
    fn rename_style(&self) -> RenameStyle {
        RenameStyle::Cookies
    }

    fn waker(&self) -> Arc<dyn BackendWaker> {
        Arc::clone(&self.waker) as Arc<dyn BackendWaker>
    }

    fn listen(&mut self) -> Result<Vec<RawEvent>, BackendError> {
        loop {
            match self.poll.poll(&mut self.events, None) {
                Ok(()) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(BackendError::io("unable to poll for events", err)),
            }
        }

        let mut readable = false;
        for event in self.events.iter() {
            if event.token() == INOTIFY {
                readable = true;
            }
        }
        if !readable {
            // A pure wake; the substrate will process commands.
            return Ok(Vec::new());
        }

        let mut raw = Vec::new();
        loop {
            let events = match self.inotify.read_events(&mut self.read_buffer) {
                Ok(events) => events,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    return Err(BackendError::io("unable to read inotify events", err));
                }
            };

            let mut any = false;
            for event in events {
                any = true;

                if event.mask.contains(EventMask::Q_OVERFLOW) {
                    tracing::warn!("inotify event queue overflowed, some events were missed");
                    for channel in self.by_channel.keys() {
                        raw.push(RawEvent::rescan(*channel));
                    }
                    continue;
                }

                let Some(entry) = self.watches.get(&event.wd) else {
                    continue;
                };
                let channel = entry.channel;
                let path = match event.name {
                    Some(name) => entry.path.join(name),
                    None => entry.path.clone(),
                };

                if event.mask.contains(EventMask::IGNORED) {
                    // The kernel dropped this watch; the directory is gone.
                    let wd = event.wd.clone();
                    self.watches.remove(&wd);
                    if let Some(descriptors) = self.by_channel.get_mut(&channel) {
                        descriptors.retain(|d| *d != wd);
                    }
                    continue;
                }

                let mut flags = if event.mask.contains(EventMask::ISDIR) {
                    RawFlags::IS_DIRECTORY
                } else {
                    RawFlags::IS_FILE
                };

                if event.mask.contains(EventMask::MOVED_FROM) {
                    raw.push(RawEvent::moved_from(channel, path, flags, event.cookie));
                    continue;
                }
                if event.mask.contains(EventMask::MOVED_TO) {
                    raw.push(RawEvent::moved_to(channel, path, flags, event.cookie));
                    continue;
                }

                if event.mask.contains(EventMask::CREATE) {
                    flags |= RawFlags::CREATED;
                }
                if event.mask.contains(EventMask::DELETE)
                    || event.mask.contains(EventMask::DELETE_SELF)
                    || event.mask.contains(EventMask::UNMOUNT)
                {
                    flags |= RawFlags::DELETED;
                }
                if event.mask.contains(EventMask::MODIFY)
                    || event.mask.contains(EventMask::ATTRIB)
                {
                    flags |= RawFlags::MODIFIED;
                }
                if event.mask.contains(EventMask::MOVE_SELF) {
                    flags |= RawFlags::RENAMED;
                }

                if flags.intersects(
                    RawFlags::CREATED | RawFlags::DELETED | RawFlags::MODIFIED | RawFlags::RENAMED,
                ) {
                    raw.push(RawEvent::new(channel, path, flags));
                }
            }

            if !any {
                break;
            }
        }

        Ok(raw)
    }

    fn add_root(
        &mut self,
        channel: ChannelId,
        root: &Path,
        recursive: bool,
    ) -> Result<(), BackendError> {
        self.add_tree(channel, root, recursive)
    }

    fn remove_root(&mut self, channel: ChannelId) -> Result<(), BackendError> {
        let descriptors = self.by_channel.remove(&channel).unwrap_or_default();
        for wd in descriptors {
            self.watches.remove(&wd);
            if let Err(err) = self.inotify.watches().remove(wd) {
                tracing::trace!(error = %err, "watch already gone");
            }
        }
        tracing::debug!(channel = %channel, "channel unwatched");
        Ok(())
    }

    fn track_subdirectory(
        &mut self,
        channel: ChannelId,
        path: &Path,
    ) -> Result<(), BackendError> {
        self.add_tree(channel, path, true)
    }
}
