//! Dotted config field path.

use owo_colors::OwoColorize;
use std::fmt;

/// Location of a field in `devroot.toml`, e.g. `watch.debounce_ms`.
///
/// Sections declare their paths as associated constants so diagnostics
/// never carry hand-typed strings:
///
/// ```ignore
/// diag.error(WatchConfig::DEBOUNCE_MS, "must be greater than 0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(&'static str);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}
