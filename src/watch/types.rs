use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use thiserror::Error;

/// Insertion-ordered set of distinct logical paths.
pub type ChangeSet = IndexSet<String>;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    /// The backend dropped events; everything under the path may have changed.
    Overflow,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Overflow => "overflow",
        }
    }
}

/// One raw event from the provider. An `Overflow` may carry an empty path
/// when the backend could not tell which directory lost events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl RawChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Opaque token for a registered directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHandle {
    id: u64,
    path: PathBuf,
}

impl WatchHandle {
    pub(super) fn new(id: u64, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A physical document root and the logical prefix it is merged under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedRoot {
    pub physical: PathBuf,
    pub mount: String,
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot watch `{}`: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: &'static str },

    #[error("watch provider is closed")]
    Closed,

    #[error("watch backend error")]
    Backend(#[from] notify::Error),
}
