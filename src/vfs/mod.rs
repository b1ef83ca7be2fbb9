//! Merged virtual filesystem.
//!
//! Presents one logical tree over several physical roots:
//!
//! ```text
//! "/"        → [target/devroot (0), src/main/webapp (1), target/generated (2)]
//! "/vendor"  → [node_modules (0)]
//!
//! resolve("/css/site.css")   → first root (by priority) holding css/site.css
//! resolve("/vendor/x.js")    → node_modules/x.js (longest prefix wins)
//! ```
//!
//! The mount table is an immutable snapshot behind `ArcSwap`: readers load
//! the current table, writers build a new one and swap it in. A request
//! never observes a half-applied mount change.

mod error;
mod mount;
pub mod path;


use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;

pub use error::VfsError;
pub use mount::{MergedMount, MountTable};

/// Where a logical path was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalLocation {
    /// Normalized logical path that was resolved.
    pub logical: String,
    /// Physical root that served the match.
    pub root: PathBuf,
    /// Full physical path of the match.
    pub path: PathBuf,
}

/// Resolver handed to the resource pipeline.
pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Result<Option<PhysicalLocation>, VfsError>;
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError>;
}

pub struct MergedVfs {
    table: ArcSwap<MountTable>,
}

impl Default for MergedVfs {
    fn default() -> Self {
        Self::new()
    }
}

impl MergedVfs {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(MountTable::default()),
        }
    }

    /// Current mount table snapshot.
    #[inline]
    pub fn snapshot(&self) -> Arc<MountTable> {
        self.table.load_full()
    }

    /// Replace or establish the mapping for `prefix`. Root priority is the
    /// position in `roots`.
    pub fn mount(&self, prefix: &str, roots: Vec<PathBuf>) -> Result<(), VfsError> {
        let prefix = path::normalize(prefix)?;
        self.table.rcu(|table| {
            let mut next = MountTable::clone(table);
            next.upsert(MergedMount::new(prefix.clone(), roots.iter().cloned()));
            next
        });
        crate::debug!("vfs"; "mounted {} ({} roots)", prefix, roots.len());
        Ok(())
    }

    /// Add one root to `prefix`, creating the mount when missing.
    pub fn add_root(&self, prefix: &str, priority: u32, root: PathBuf) -> Result<(), VfsError> {
        let prefix = path::normalize(prefix)?;
        self.table.rcu(|table| {
            let mut next = MountTable::clone(table);
            match next.get_mut(&prefix) {
                Some(mount) => mount.insert(priority, root.clone()),
                None => {
                    let mut mount = MergedMount::new(prefix.clone(), []);
                    mount.insert(priority, root.clone());
                    next.upsert(mount);
                }
            }
            next
        });
        Ok(())
    }

    /// Resolve a logical path to its highest-priority physical match.
    ///
    /// `Ok(None)` means no mounted root holds the path.
    pub fn resolve(&self, logical: &str) -> Result<Option<PhysicalLocation>, VfsError> {
        let logical = path::normalize(logical)?;
        self.table.load().resolve(&logical)
    }

    /// Read a file through the merged tree.
    pub fn read(&self, logical: &str) -> Result<Vec<u8>, VfsError> {
        let location = self
            .resolve(logical)?
            .ok_or_else(|| VfsError::ResourceNotFound(logical.to_string()))?;

        if location.path.is_dir() {
            return Err(VfsError::ResourceNotFound(location.logical));
        }

        std::fs::read(&location.path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => VfsError::ResourceNotFound(location.logical.clone()),
            _ => VfsError::Io {
                path: location.path.clone(),
                source,
            },
        })
    }
}

impl ResourceResolver for MergedVfs {
    fn resolve(&self, path: &str) -> Result<Option<PhysicalLocation>, VfsError> {
        MergedVfs::resolve(self, path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        MergedVfs::read(self, path)
    }
}
