//! `[[mounts]]` section configuration.
//!
//! Each mount binds a logical prefix to an ordered list of document roots.
//! Roots listed first shadow later ones for the same logical path.
//!
//! ```toml
//! [[mounts]]
//! prefix = "/"
//! roots = ["src/main/webapp", "target/generated"]
//!
//! [[mounts]]
//! prefix = "/vendor"
//! roots = ["~/libs/vendor"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::path::resolve_config_path;

/// One logical prefix and the directories merged under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Logical prefix, always starting with `/`.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Document roots in priority order (first wins).
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

fn default_prefix() -> String {
    "/".into()
}

impl MountConfig {
    pub const FIELD: FieldPath = FieldPath::new("mounts");

    pub fn new(prefix: impl Into<String>, roots: Vec<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            roots,
        }
    }

    /// Resolve every root against the config directory.
    pub fn normalize(&mut self, base: &Path) {
        for root in &mut self.roots {
            *root = resolve_config_path(root, base);
        }
    }

    /// Validate the mount list as a whole.
    pub fn validate_all(mounts: &[Self], diag: &mut ConfigDiagnostics) {
        if mounts.iter().all(|m| m.roots.is_empty()) {
            diag.error_with_hint(
                Self::FIELD,
                "no document root configured",
                "add a [[mounts]] table or pass `--root <DIR>`",
            );
        }

        let mut seen: Vec<&str> = Vec::with_capacity(mounts.len());
        for mount in mounts {
            mount.validate(diag);
            let prefix = mount.prefix.trim_end_matches('/');
            if seen.contains(&prefix) {
                diag.error(
                    Self::FIELD,
                    format!("prefix `{}` is mounted twice", mount.prefix),
                );
            }
            seen.push(prefix);
        }
    }

    fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.prefix.starts_with('/') {
            diag.error_with_hint(
                Self::FIELD,
                format!("prefix `{}` must start with `/`", self.prefix),
                format!("use `/{}`", self.prefix),
            );
        }
        if self.roots.is_empty() {
            diag.error(
                Self::FIELD,
                format!("prefix `{}` has no roots", self.prefix),
            );
        }
        for root in &self.roots {
            if !root.is_dir() {
                diag.error(
                    Self::FIELD,
                    format!("root `{}` is not a directory", root.display()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_mounts_parse_in_order() {
        let config = test_parse_config(
            "[[mounts]]\nroots = [\"web\", \"gen\"]\n\n[[mounts]]\nprefix = \"/lib\"\nroots = [\"vendor\"]",
        );

        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[0].prefix, "/");
        assert_eq!(
            config.mounts[0].roots,
            [PathBuf::from("web"), PathBuf::from("gen")]
        );
        assert_eq!(config.mounts[1].prefix, "/lib");
    }

    #[test]
    fn test_validate_requires_a_root() {
        let mut diag = ConfigDiagnostics::new();
        MountConfig::validate_all(&[], &mut diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn test_validate_prefix_and_duplicates() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let mounts = [
            MountConfig::new("/", vec![root.clone()]),
            MountConfig::new("lib", vec![root.clone()]),
            MountConfig::new("/", vec![root]),
        ];

        let mut diag = ConfigDiagnostics::new();
        MountConfig::validate_all(&mounts, &mut diag);

        let messages: Vec<&str> = diag.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("must start with")));
        assert!(messages.iter().any(|m| m.contains("mounted twice")));
    }

    #[test]
    fn test_validate_missing_directory() {
        let mounts = [MountConfig::new("/", vec![PathBuf::from("/nonexistent/devroot")])];
        let mut diag = ConfigDiagnostics::new();
        MountConfig::validate_all(&mounts, &mut diag);
        assert!(diag.errors()[0].message.contains("not a directory"));
    }

    #[test]
    fn test_normalize_resolves_against_base() {
        let mut mount = MountConfig::new("/", vec![PathBuf::from("webapp")]);
        mount.normalize(Path::new("/nonexistent/site"));
        assert_eq!(mount.roots, [PathBuf::from("/nonexistent/site/webapp")]);
    }
}
