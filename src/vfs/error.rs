use std::path::PathBuf;

use thiserror::Error;

/// Errors from logical path resolution.
///
/// `PathTraversal` and `ResourceNotFound` are per-request conditions; the HTTP
/// layer answers both with 404.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("path escapes the mounted roots: {0}")]
    PathTraversal(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VfsError {
    /// True for conditions a client should see as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathTraversal(_) | Self::ResourceNotFound(_))
    }
}
