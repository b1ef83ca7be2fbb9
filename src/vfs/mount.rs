//! Mount table: logical prefixes bound to prioritized physical roots.

use std::path::{Path, PathBuf};

use super::{PhysicalLocation, VfsError, path};

/// One physical root of a mount. Lower `priority` is consulted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRoot {
    pub priority: u32,
    pub path: PathBuf,
}

/// A logical subtree backed by an ordered list of physical roots.
///
/// `roots` is kept sorted by ascending priority; equal priorities keep
/// insertion order.
#[derive(Debug, Clone)]
pub struct MergedMount {
    prefix: String,
    roots: Vec<MountRoot>,
}

impl MergedMount {
    /// Build a mount whose root priority is its position in `roots`.
    pub fn new(prefix: String, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let roots = roots
            .into_iter()
            .enumerate()
            .map(|(i, path)| MountRoot {
                priority: u32::try_from(i).unwrap_or(u32::MAX),
                path,
            })
            .collect();
        Self { prefix, roots }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn roots(&self) -> &[MountRoot] {
        &self.roots
    }

    /// Insert (or move) a root at `priority`, after existing roots with the
    /// same priority.
    pub(super) fn insert(&mut self, priority: u32, root: PathBuf) {
        self.roots.retain(|r| r.path != root);
        let pos = self.roots.partition_point(|r| r.priority <= priority);
        self.roots.insert(
            pos,
            MountRoot {
                priority,
                path: root,
            },
        );
    }

    /// Find the first root (by priority) containing `rest`.
    fn locate(&self, logical: &str, rest: &str) -> Result<Option<PhysicalLocation>, VfsError> {
        for root in &self.roots {
            let candidate = if rest.is_empty() {
                root.path.clone()
            } else {
                root.path.join(rest)
            };
            if std::fs::metadata(&candidate).is_err() {
                continue;
            }

            // The match must stay inside its root after following symlinks.
            let (Ok(real_root), Ok(real)) = (root.path.canonicalize(), candidate.canonicalize())
            else {
                continue;
            };
            if !real.starts_with(&real_root) {
                return Err(VfsError::PathTraversal(logical.to_string()));
            }

            return Ok(Some(PhysicalLocation {
                logical: logical.to_string(),
                root: root.path.clone(),
                path: candidate,
            }));
        }
        Ok(None)
    }
}

/// Immutable snapshot of every mount.
///
/// Mounts are ordered by descending prefix length so the first prefix match
/// is the longest.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: Vec<MergedMount>,
}

impl MountTable {
    pub fn mounts(&self) -> &[MergedMount] {
        &self.mounts
    }

    /// Every `(prefix, physical root)` pair in the table.
    pub fn roots(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.mounts()
            .iter()
            .flat_map(|m| m.roots().iter().map(move |r| (m.prefix(), r.path.as_path())))
    }

    pub(super) fn get_mut(&mut self, prefix: &str) -> Option<&mut MergedMount> {
        self.mounts.iter_mut().find(|m| m.prefix == prefix)
    }

    /// Replace the mount for `mount.prefix`, or add it.
    pub(super) fn upsert(&mut self, mount: MergedMount) {
        match self.get_mut(&mount.prefix) {
            Some(existing) => *existing = mount,
            None => {
                self.mounts.push(mount);
                self.mounts
                    .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
            }
        }
    }

    /// Resolve a normalized logical path against the longest matching prefix.
    pub(super) fn resolve(&self, logical: &str) -> Result<Option<PhysicalLocation>, VfsError> {
        let Some((mount, rest)) = self
            .mounts
            .iter()
            .find_map(|m| path::strip_prefix(logical, &m.prefix).map(|rest| (m, rest)))
        else {
            return Ok(None);
        };
        mount.locate(logical, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_priority_order() {
        let mut mount = MergedMount::new("/".into(), [PathBuf::from("/a"), PathBuf::from("/b")]);
        mount.insert(0, PathBuf::from("/c"));

        let order: Vec<_> = mount.roots().iter().map(|r| r.path.clone()).collect();
        assert_eq!(order, [PathBuf::from("/a"), PathBuf::from("/c"), PathBuf::from("/b")]);
    }

    #[test]
    fn test_insert_moves_existing_root() {
        let mut mount = MergedMount::new("/".into(), [PathBuf::from("/a"), PathBuf::from("/b")]);
        mount.insert(5, PathBuf::from("/a"));

        assert_eq!(mount.roots().len(), 2);
        assert_eq!(mount.roots()[1].path, PathBuf::from("/a"));
    }

    #[test]
    fn test_longest_prefix_first() {
        let mut table = MountTable::default();
        table.upsert(MergedMount::new("/".into(), []));
        table.upsert(MergedMount::new("/static/vendor".into(), []));
        table.upsert(MergedMount::new("/static".into(), []));

        let prefixes: Vec<_> = table.mounts().iter().map(MergedMount::prefix).collect();
        assert_eq!(prefixes, ["/static/vendor", "/static", "/"]);
    }
}
