//! Logical path handling.
//!
//! Logical paths are `/`-separated strings rooted at `/`, independent of the
//! host's path syntax. A normalized path has no empty, `.` or `..` segments
//! and no trailing slash (except the root itself).

use super::VfsError;

/// Normalize a logical path.
///
/// `.` segments are dropped and `..` pops the previous segment. Popping above
/// the root, a backslash or a NUL byte is rejected as traversal.
pub fn normalize(raw: &str) -> Result<String, VfsError> {
    if raw.contains(['\\', '\0']) {
        return Err(VfsError::PathTraversal(raw.to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(VfsError::PathTraversal(raw.to_string()));
                }
            }
            s => segments.push(s),
        }
    }

    Ok(format!("/{}", segments.join("/")))
}

/// Strip a normalized mount prefix from a normalized path.
///
/// Matches whole segments only: `/app` is a prefix of `/app/x` but not of
/// `/apple`. Returns the remainder without a leading slash.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" {
        return path.strip_prefix('/');
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// Join a relative remainder onto a normalized mount prefix.
pub fn join(prefix: &str, rest: &str) -> String {
    let rest = rest.trim_matches('/');
    match (prefix, rest) {
        (p, "") => p.to_string(),
        ("/", r) => format!("/{r}"),
        (p, r) => format!("{p}/{r}"),
    }
}
