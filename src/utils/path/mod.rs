//! Path utilities.
//!
//! - [`fs`]: filesystem path normalization (`normalize_path`, `resolve_config_path`, `is_within`)

pub mod fs;

pub use fs::{is_within, normalize_path, resolve_config_path};
