use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::WatchedRoot;
use crate::utils::path::is_within;
use crate::vfs::path::join;

/// Watched roots shared between the serve context and the watch loop.
///
/// Roots mounted while serving are published here and picked up by the
/// loop on its next event.
#[derive(Clone, Default)]
pub struct RootSet(Arc<ArcSwap<Vec<WatchedRoot>>>);

impl RootSet {
    pub fn new(roots: Vec<WatchedRoot>) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(roots)))
    }

    /// Publish `root`. Returns `false` when it is already known.
    pub fn add(&self, root: WatchedRoot) -> bool {
        let mut added = false;
        self.0.rcu(|roots| {
            added = !roots.contains(&root);
            let mut next = Vec::clone(roots);
            if added {
                next.push(root.clone());
            }
            next
        });
        added
    }

    pub fn len(&self) -> usize {
        self.0.load().len()
    }

    fn snapshot(&self) -> Arc<Vec<WatchedRoot>> {
        self.0.load_full()
    }
}

impl From<Vec<WatchedRoot>> for RootSet {
    fn from(roots: Vec<WatchedRoot>) -> Self {
        Self::new(roots)
    }
}

/// Logical side of one physical event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Logical {
    /// A single logical path.
    File(String),
    /// The path cannot be expressed logically; everything under the mount
    /// prefix may have changed.
    Subtree(String),
}

/// Maps physical event paths onto logical paths.
pub(super) struct RootMap {
    roots: RootSet,
    excluded: Vec<PathBuf>,
}

impl RootMap {
    pub(super) fn new(roots: impl Into<RootSet>, excluded: Vec<PathBuf>) -> Self {
        Self {
            roots: roots.into(),
            excluded,
        }
    }

    /// True for paths that never trigger a rebuild.
    pub(super) fn is_ignored(&self, path: &Path) -> bool {
        is_temp_file(path) || self.excluded.iter().any(|dir| is_within(path, dir))
    }

    /// Logical paths for `path`, one per root containing it.
    pub(super) fn logical_paths(&self, path: &Path) -> Vec<Logical> {
        self.roots
            .snapshot()
            .iter()
            .filter_map(|root| {
                let rest = path.strip_prefix(&root.physical).ok()?;
                Some(match relative_str(rest) {
                    Some(rest) => Logical::File(join(&root.mount, &rest)),
                    None => Logical::Subtree(root.mount.clone()),
                })
            })
            .collect()
    }

    /// Mount prefixes to widen on overflow.
    ///
    /// An unknown path (empty, or outside every root) widens to every mount.
    pub(super) fn overflow_prefixes(&self, path: &Path) -> Vec<String> {
        let roots = self.roots.snapshot();
        let known = !path.as_os_str().is_empty();
        let matching: Vec<&WatchedRoot> = roots
            .iter()
            .filter(|root| {
                known && (is_within(path, &root.physical) || is_within(&root.physical, path))
            })
            .collect();
        let selected = if matching.is_empty() {
            roots.iter().collect()
        } else {
            matching
        };

        let mut prefixes: Vec<String> = Vec::new();
        for root in selected {
            if !prefixes.contains(&root.mount) {
                prefixes.push(root.mount.clone());
            }
        }
        prefixes
    }
}

/// Join normal components with `/`. `None` for non-UTF-8 names and
/// anything that is not a plain component.
fn relative_str(rest: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in rest.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments.join("/"))
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
