//! Notification backends.
//!
//! `Native` wraps the platform's recommended watcher (inotify, FSEvents,
//! kqueue, ReadDirectoryChangesW). `Poll` diffs directory snapshots on a
//! fixed interval and is chosen once at startup when native notification is
//! unavailable.

use std::path::Path;
use std::time::Duration;

use crossbeam::channel::Sender;
use notify::{
    Config, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher, WatcherKind,
};

use super::WatchError;
use crate::config::BackendKind;

pub(super) type EventSender = Sender<notify::Result<notify::Event>>;

pub(super) enum Backend {
    Native(RecommendedWatcher),
    Poll(PollWatcher),
}

impl Backend {
    /// Capability check: pick a backend for this platform.
    ///
    /// `Auto` falls back to polling when the recommended watcher is itself a
    /// poll watcher or cannot be created.
    pub(super) fn select(
        kind: BackendKind,
        poll_interval: Duration,
        tx: EventSender,
    ) -> Result<Self, WatchError> {
        match kind {
            BackendKind::Native => Ok(Self::native(tx)?),
            BackendKind::Poll => Ok(Self::poll(poll_interval, tx)?),
            BackendKind::Auto if !native_available() => Ok(Self::poll(poll_interval, tx)?),
            BackendKind::Auto => match Self::native(tx.clone()) {
                Ok(backend) => Ok(backend),
                Err(e) => {
                    crate::log!("watch"; "native watcher unavailable ({e}), polling every {}ms", poll_interval.as_millis());
                    Ok(Self::poll(poll_interval, tx)?)
                }
            },
        }
    }

    fn native(tx: EventSender) -> notify::Result<Self> {
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        Ok(Self::Native(watcher))
    }

    fn poll(interval: Duration, tx: EventSender) -> notify::Result<Self> {
        let watcher = PollWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(interval),
        )?;
        Ok(Self::Poll(watcher))
    }

    pub(super) fn name(&self) -> &'static str {
        match self {
            Self::Native(_) => "native",
            Self::Poll(_) => "poll",
        }
    }

    pub(super) fn watch(&mut self, path: &Path) -> notify::Result<()> {
        match self {
            Self::Native(w) => w.watch(path, RecursiveMode::Recursive),
            Self::Poll(w) => w.watch(path, RecursiveMode::Recursive),
        }
    }

    pub(super) fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        match self {
            Self::Native(w) => w.unwatch(path),
            Self::Poll(w) => w.unwatch(path),
        }
    }
}

/// True when the platform has a real notification facility.
fn native_available() -> bool {
    RecommendedWatcher::kind() != WatcherKind::PollWatcher
}
