//! Path normalization utilities.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `resolve_config_path` - expand `~` and resolve against a base directory
//! - `is_within` - component-wise ancestor-or-self check

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
///
/// Deleted files cannot be canonicalized, so watcher events for removals
/// go through the fallback.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Resolve a path from the config file or the command line.
///
/// Expands a leading `~`, then joins relative paths onto `base`
/// (the directory holding `devroot.toml`). Always returns an absolute path.
pub fn resolve_config_path(raw: &Path, base: &Path) -> PathBuf {
    let raw_str = raw.to_string_lossy();
    let expanded = PathBuf::from(shellexpand::tilde(&raw_str).as_ref());

    if expanded.is_absolute() {
        return normalize_path(&expanded);
    }
    normalize_path(&base.join(expanded))
}

/// True when `path` equals `ancestor` or lies below it.
///
/// Compares whole components, so `/site/app` is not within `/site/ap`.
#[inline]
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}
