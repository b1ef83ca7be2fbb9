//! File watching.
//!
//! Turns raw filesystem notifications into debounced sets of changed logical
//! paths. Implements the "Watcher-First" pattern: roots are registered
//! before the startup rebuild, so edits made during it are not lost.
//!
//! Architecture:
//! ```text
//! WatchProvider (backend) → RootMap (physical → logical) → Debouncer → on_flush(ChangeSet)
//! ```

// Notification backends and the capability check.
mod backend;
// Pure timing and deduplication.
mod debouncer;
// Blocking, closable event source.
mod provider;
// Antichain of registered directories.
mod registry;
// Physical to logical path mapping.
mod roots;
// Shared watch types.
mod types;


use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;
use std::sync::Arc;

use debouncer::Debouncer;
use roots::{Logical, RootMap};

pub use provider::WatchProvider;
pub use registry::WatchRegistry;
pub use roots::RootSet;
pub use types::{ChangeKind, ChangeSet, RawChangeEvent, WatchError, WatchHandle, WatchedRoot};

/// Pause after an unexpected provider error, so a failing backend cannot spin.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Background loop feeding debounced change sets to `on_flush`.
///
/// Flushes run on the loop's own thread, so consecutive rebuilds never
/// overlap. Closing the provider is the only way to stop it.
pub struct WatchLoop<F> {
    provider: Arc<WatchProvider>,
    roots: RootMap,
    debouncer: Debouncer,
    on_flush: F,
}

impl<F> WatchLoop<F>
where
    F: FnMut(ChangeSet) + Send + 'static,
{
    pub fn new(
        provider: Arc<WatchProvider>,
        roots: impl Into<RootSet>,
        excluded: Vec<PathBuf>,
        quiet: Duration,
        max_wait: Duration,
        on_flush: F,
    ) -> Self {
        Self {
            provider,
            roots: RootMap::new(roots, excluded),
            debouncer: Debouncer::new(quiet, max_wait),
            on_flush,
        }
    }

    /// Run the loop on a dedicated `watch` thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("watch".into())
            .spawn(move || self.run())
    }

    /// Run until the provider is closed.
    pub fn run(mut self) {
        loop {
            match self.provider.wait_for_events(self.debouncer.sleep_duration()) {
                Ok(batch) => {
                    for event in batch {
                        self.accept(event);
                    }
                }
                Err(WatchError::Closed) => {
                    crate::debug!("watch"; "loop stopped");
                    break;
                }
                Err(e) => {
                    crate::log!("watch"; "{:#}", anyhow::Error::from(e));
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }

            if let Some(changes) = self.debouncer.take_if_ready() {
                for path in &changes {
                    crate::debug!("watch"; "changed: {}", path);
                }
                (self.on_flush)(changes);
            }
        }
    }

    /// Fold one raw event into the pending set.
    fn accept(&mut self, event: RawChangeEvent) {
        if event.kind == ChangeKind::Overflow {
            crate::debug!("watch"; "overflow at {}", event.path.display());
            for prefix in self.roots.overflow_prefixes(&event.path) {
                self.debouncer.widen(&prefix);
            }
            return;
        }

        if self.roots.is_ignored(&event.path) {
            return;
        }

        let logical = self.roots.logical_paths(&event.path);
        if logical.is_empty() {
            crate::debug!("watch"; "outside roots: {}", event.path.display());
        }
        for change in logical {
            match change {
                Logical::File(path) => {
                    crate::debug!("watch"; "{}: {}", event.kind.label(), path);
                    self.debouncer.add(path);
                }
                Logical::Subtree(prefix) => {
                    crate::debug!(
                        "watch";
                        "{}: non-UTF-8 path {}, widening to {}",
                        event.kind.label(),
                        event.path.display(),
                        prefix
                    );
                    self.debouncer.widen(&prefix);
                }
            }
        }
    }
}
