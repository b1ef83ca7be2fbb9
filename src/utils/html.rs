//! HTML utility functions.

use std::borrow::Cow;

/// Characters that require HTML escaping.
const ESCAPE_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    }
}

/// Escape HTML special characters in text content.
///
/// Uses `Cow` to avoid allocation when no escaping is needed.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match escape_char(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Insert `snippet` right before the last `</body>` (case-insensitive),
/// or append it when the document has no body end tag.
pub fn insert_before_body_end(content: &[u8], snippet: &[u8]) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + snippet.len());
    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(snippet);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(snippet);
        }
    }
    result
}
