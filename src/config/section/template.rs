//! `[template]` section configuration.
//!
//! ```toml
//! [template]
//! engine = "static"           # none | static
//! extensions = ["html", "htm"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Which template engine answers `compile`/`render`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Never recognizes a template; every change goes to the pipeline.
    None,
    /// Cached `{{name}}` substitution over VFS files.
    #[default]
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub engine: EngineKind,
    /// File extensions (without dot) treated as templates.
    pub extensions: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Static,
            extensions: vec!["html".into(), "htm".into()],
        }
    }
}

impl TemplateConfig {
    pub const EXTENSIONS: FieldPath = FieldPath::new("template.extensions");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.engine == EngineKind::Static && self.extensions.is_empty() {
            diag.warn(
                Self::EXTENSIONS,
                "empty: the static engine will not recognize any template",
            );
        }
    }
}
