//! Native watch provider.
//!
//! Wraps one [`Backend`] behind a blocking, closable event source:
//!
//! ```text
//! notify callback ──► events channel ──► wait_for_events(timeout)
//!                                            ▲
//! close() ── drops close_tx ─────────────────┘ (wakes every waiter)
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, bounded, select, unbounded};
use notify::EventKind;
use notify::event::ModifyKind;
use parking_lot::Mutex;

use super::backend::Backend;
use super::{ChangeKind, RawChangeEvent, WatchError, WatchHandle};
use crate::config::BackendKind;

/// Upper bound on raw notify results drained into one batch.
const MAX_BATCH: usize = 1024;

pub struct WatchProvider {
    backend: Mutex<Option<Backend>>,
    backend_name: &'static str,
    events: Receiver<notify::Result<notify::Event>>,
    close_tx: Mutex<Option<Sender<()>>>,
    close_rx: Receiver<()>,
    closed: AtomicBool,
    next_id: AtomicU64,
}

impl WatchProvider {
    /// Create a provider with the backend chosen by `kind`.
    pub fn new(kind: BackendKind, poll_interval: Duration) -> Result<Self, WatchError> {
        let (tx, events) = unbounded();
        let backend = Backend::select(kind, poll_interval, tx)?;
        let (close_tx, close_rx) = bounded(0);

        Ok(Self {
            backend_name: backend.name(),
            backend: Mutex::new(Some(backend)),
            events,
            close_tx: Mutex::new(Some(close_tx)),
            close_rx,
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        })
    }

    /// Name of the selected backend (`native` or `poll`).
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Register `dir` recursively.
    pub fn register(&self, dir: &Path) -> Result<WatchHandle, WatchError> {
        let reason = match std::fs::metadata(dir) {
            Err(_) => Some("does not exist"),
            Ok(meta) if !meta.is_dir() => Some("not a directory"),
            Ok(_) => None,
        };
        if let Some(reason) = reason {
            return Err(WatchError::Unsupported {
                path: dir.to_path_buf(),
                reason,
            });
        }

        let mut guard = self.backend.lock();
        let backend = guard.as_mut().ok_or(WatchError::Closed)?;
        backend.watch(dir)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        crate::debug!("watch"; "registered #{} {}", id, dir.display());
        Ok(WatchHandle::new(id, dir.to_path_buf()))
    }

    /// Drop a registration. Unknown or already-closed handles are ignored.
    pub fn unregister(&self, handle: &WatchHandle) {
        crate::debug!("watch"; "unwatch #{} {}", handle.id(), handle.path().display());
        if let Some(backend) = self.backend.lock().as_mut()
            && let Err(e) = backend.unwatch(handle.path())
        {
            crate::debug!("watch"; "unwatch {} failed: {}", handle.path().display(), e);
        }
    }

    /// Block until events arrive, `timeout` elapses or the provider closes.
    ///
    /// Returns an empty batch on timeout.
    pub fn wait_for_events(&self, timeout: Duration) -> Result<Vec<RawChangeEvent>, WatchError> {
        if self.is_closed() {
            return Err(WatchError::Closed);
        }

        let first = select! {
            recv(self.events) -> msg => match msg {
                Ok(result) => result,
                Err(_) => return Err(WatchError::Closed),
            },
            recv(self.close_rx) -> _ => return Err(WatchError::Closed),
            default(timeout) => return Ok(Vec::new()),
        };

        let mut batch = Vec::new();
        translate(first, &mut batch);
        for result in self.events.try_iter().take(MAX_BATCH) {
            translate(result, &mut batch);
        }

        if self.is_closed() {
            return Err(WatchError::Closed);
        }
        Ok(batch)
    }

    /// Release the backend and wake all waiters. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(self.backend.lock().take());
        drop(self.close_tx.lock().take());
        crate::debug!("watch"; "provider closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for WatchProvider {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map one notify result onto raw change events.
fn translate(result: notify::Result<notify::Event>, out: &mut Vec<RawChangeEvent>) {
    let event = match result {
        Ok(event) => event,
        Err(err) => {
            crate::debug!("watch"; "backend error: {}", err);
            let path = err.paths.first().cloned().unwrap_or_default();
            out.push(RawChangeEvent::new(ChangeKind::Overflow, path));
            return;
        }
    };

    if event.need_rescan() {
        if event.paths.is_empty() {
            out.push(RawChangeEvent::new(ChangeKind::Overflow, ""));
        }
        for path in event.paths {
            out.push(RawChangeEvent::new(ChangeKind::Overflow, path));
        }
        return;
    }

    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        // Metadata-only changes (mtime/atime/chmod) would retrigger rebuilds
        EventKind::Modify(ModifyKind::Metadata(_)) => return,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        _ => return,
    };

    crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
    out.extend(
        event
            .paths
            .into_iter()
            .map(|path| RawChangeEvent::new(kind, path)),
    );
}
