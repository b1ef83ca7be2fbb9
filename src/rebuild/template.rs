//! Template engines.
//!
//! The coordinator only needs `compile`; the HTTP layer uses `accepts` and
//! `render`.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::utils::html::escape;
use crate::vfs::{ResourceResolver, VfsError};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{path}` is unreadable")]
    Unreadable {
        path: String,
        #[source]
        source: VfsError,
    },

    #[error("template `{0}` is not valid UTF-8")]
    Encoding(String),

    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("no template engine configured, cannot render `{0}`")]
    NoEngine(String),
}

/// Template collaborator.
pub trait TemplateEngine: Send + Sync {
    /// Recompile `path`.
    ///
    /// `Ok(false)` when `path` is not a template, `Err` when it is one but
    /// cannot be read.
    fn compile(&self, path: &str) -> Result<bool, TemplateError>;

    /// Whether requests for `path` are rendered by this engine.
    fn accepts(&self, path: &str) -> bool;

    /// Render `path` with per-request `data`.
    fn render(&self, path: &str, data: &serde_json::Value) -> Result<String, TemplateError>;
}

/// Engine used when templating is disabled: recognizes nothing.
pub struct NullTemplates;

impl TemplateEngine for NullTemplates {
    fn compile(&self, _path: &str) -> Result<bool, TemplateError> {
        Ok(false)
    }

    fn accepts(&self, _path: &str) -> bool {
        false
    }

    fn render(&self, path: &str, _data: &serde_json::Value) -> Result<String, TemplateError> {
        Err(TemplateError::NoEngine(path.to_string()))
    }
}

/// Plain-text templates read through the merged filesystem.
///
/// `{{name}}` placeholders are replaced by the HTML-escaped top-level values
/// of the request data; unknown names are left in place.
pub struct StaticTemplates {
    resolver: Arc<dyn ResourceResolver>,
    extensions: Vec<String>,
    cache: DashMap<String, Arc<str>>,
}

impl StaticTemplates {
    pub fn new(resolver: Arc<dyn ResourceResolver>, extensions: &[String]) -> Self {
        Self {
            resolver,
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            cache: DashMap::new(),
        }
    }

    fn load(&self, path: &str) -> Result<Arc<str>, TemplateError> {
        let bytes = self.resolver.read(path).map_err(|source| match source {
            VfsError::ResourceNotFound(_) | VfsError::PathTraversal(_) => {
                TemplateError::NotFound(path.to_string())
            }
            source => TemplateError::Unreadable {
                path: path.to_string(),
                source,
            },
        })?;
        let source: Arc<str> = String::from_utf8(bytes)
            .map_err(|_| TemplateError::Encoding(path.to_string()))?
            .into();
        self.cache.insert(path.to_string(), Arc::clone(&source));
        Ok(source)
    }
}

impl TemplateEngine for StaticTemplates {
    fn compile(&self, path: &str) -> Result<bool, TemplateError> {
        if !self.accepts(path) {
            return Ok(false);
        }
        self.cache.remove(path);
        match self.load(path) {
            Ok(_) => Ok(true),
            // Deleted template: nothing left to compile
            Err(TemplateError::NotFound(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    fn accepts(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        name.rsplit_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty() && self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        })
    }

    fn render(&self, path: &str, data: &serde_json::Value) -> Result<String, TemplateError> {
        let source = match self.cache.get(path) {
            Some(cached) => Arc::clone(cached.value()),
            None => self.load(path)?,
        };
        Ok(substitute(&source, data))
    }
}

/// Replace `{{ name }}` with the escaped value of `data[name]`.
fn substitute(source: &str, data: &serde_json::Value) -> String {
    let Some(fields) = data.as_object() else {
        return source.to_string();
    };

    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let name = rest[start + 2..start + 2 + len].trim();
        out.push_str(&rest[..start]);
        match fields.get(name) {
            Some(serde_json::Value::String(s)) => out.push_str(&escape(s)),
            Some(serde_json::Value::Null) => {}
            Some(value) => out.push_str(&escape(&value.to_string())),
            None => out.push_str(&rest[start..start + len + 4]),
        }
        rest = &rest[start + len + 4..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MergedVfs;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> (TempDir, StaticTemplates) {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("index.html"),
            "<h1>{{ title }}</h1><p>{{count}}</p>{{missing}}",
        )
        .unwrap();
        std::fs::write(temp.path().join("app.css"), "body{}").unwrap();

        let vfs = Arc::new(MergedVfs::new());
        vfs.mount("/", vec![temp.path().to_path_buf()]).unwrap();
        let engine = StaticTemplates::new(vfs, &["html".into(), ".htm".into()]);
        (temp, engine)
    }

    #[test]
    fn test_accepts_by_extension() {
        let (_temp, engine) = engine();
        assert!(engine.accepts("/index.html"));
        assert!(engine.accepts("/a/b.HTM"));
        assert!(!engine.accepts("/app.css"));
        assert!(!engine.accepts("/"));
        assert!(!engine.accepts("/.html"));
    }

    #[test]
    fn test_compile() {
        let (temp, engine) = engine();
        assert!(engine.compile("/index.html").unwrap());
        assert!(!engine.compile("/app.css").unwrap());
        assert_eq!(engine.cache.len(), 1);

        std::fs::remove_file(temp.path().join("index.html")).unwrap();
        assert!(engine.compile("/index.html").unwrap());
        assert!(engine.cache.is_empty());
    }

    #[test]
    fn test_compile_invalid_utf8_fails() {
        let (temp, engine) = engine();
        std::fs::write(temp.path().join("bad.html"), [0xff, 0xfe]).unwrap();
        assert!(matches!(
            engine.compile("/bad.html"),
            Err(TemplateError::Encoding(_))
        ));
    }

    #[test]
    fn test_render_substitutes_and_escapes() {
        let (_temp, engine) = engine();
        let html = engine
            .render("/index.html", &json!({"title": "<Home>", "count": 3}))
            .unwrap();
        assert_eq!(html, "<h1>&lt;Home&gt;</h1><p>3</p>{{missing}}");
    }

    #[test]
    fn test_render_picks_up_recompiled_source() {
        let (temp, engine) = engine();
        engine.render("/index.html", &json!({})).unwrap();

        std::fs::write(temp.path().join("index.html"), "v2").unwrap();
        assert!(engine.compile("/index.html").unwrap());
        assert_eq!(engine.render("/index.html", &json!({})).unwrap(), "v2");
    }

    #[test]
    fn test_null_templates() {
        let engine = NullTemplates;
        assert!(!engine.compile("/index.html").unwrap());
        assert!(!engine.accepts("/index.html"));
        assert!(matches!(
            engine.render("/index.html", &json!({})),
            Err(TemplateError::NoEngine(_))
        ));
    }
}
