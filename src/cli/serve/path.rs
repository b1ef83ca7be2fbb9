//! Request URL to logical path resolution.

use percent_encoding::percent_decode_str;

use crate::vfs::{VfsError, path::normalize};

/// Page served for directory requests.
pub const INDEX: &str = "index.html";

/// Decoded request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Normalized logical path; `/` and trailing slashes map to `index.html`.
    pub path: String,
    /// Query parameters in request order.
    pub query: Vec<(String, String)>,
}

/// Split, decode and normalize a request URL.
///
/// Fails with `PathTraversal` when the path climbs above the root.
pub fn parse_url(url: &str) -> Result<RequestTarget, VfsError> {
    let url = url.split('#').next().unwrap_or(url);
    let (raw_path, raw_query) = url.split_once('?').unwrap_or((url, ""));

    let decoded = percent_decode_str(raw_path).decode_utf8_lossy();
    let mut path = normalize(&decoded)?;
    if decoded.ends_with('/') {
        path = index_of(&path);
    }

    Ok(RequestTarget {
        path,
        query: parse_query(raw_query),
    })
}

/// `index.html` inside the directory `dir`.
pub fn index_of(dir: &str) -> String {
    crate::vfs::path::join(dir, INDEX)
}

/// Parse `application/x-www-form-urlencoded` pairs.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
