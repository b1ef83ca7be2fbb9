//! Directory watch registry.
//!
//! Keeps the watched set an antichain under "is ancestor of": a directory
//! covered by a watched ancestor is never registered, and registering an
//! ancestor drops the descendants it now covers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{WatchError, WatchHandle, WatchProvider};
use crate::utils::path::{is_within, normalize_path};

pub struct WatchRegistry {
    provider: Arc<WatchProvider>,
    handles: FxHashMap<PathBuf, WatchHandle>,
}

impl WatchRegistry {
    pub fn new(provider: Arc<WatchProvider>) -> Self {
        Self {
            provider,
            handles: FxHashMap::default(),
        }
    }

    /// Make sure `path` is covered by a watch.
    ///
    /// Returns `Ok(false)` when an ancestor-or-self is already watched.
    pub fn ensure_watched(&mut self, path: &Path) -> Result<bool, WatchError> {
        let path = normalize_path(path);
        if self.handles.keys().any(|watched| is_within(&path, watched)) {
            crate::debug!("watch"; "already covered: {}", path.display());
            return Ok(false);
        }

        // Descendants go first: on some backends a nested unwatch would
        // remove the shared watch of the new ancestor.
        let covered: Vec<PathBuf> = self
            .handles
            .keys()
            .filter(|watched| is_within(watched, &path))
            .cloned()
            .collect();
        for dir in &covered {
            if let Some(handle) = self.handles.remove(dir) {
                self.provider.unregister(&handle);
            }
        }

        match self.provider.register(&path) {
            Ok(handle) => {
                self.handles.insert(path, handle);
                Ok(true)
            }
            Err(e) => {
                for dir in covered {
                    if let Ok(handle) = self.provider.register(&dir) {
                        self.handles.insert(dir, handle);
                    }
                }
                Err(e)
            }
        }
    }

    /// Watched directories, in no particular order.
    pub fn watched(&self) -> impl Iterator<Item = &Path> {
        self.handles.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}
