//! Per-request template data.
//!
//! A template `/page.html` may have a sibling `/page.html.cfg.json` holding
//! one entry per query string:
//!
//! ```json
//! {
//!   "": { "templateData": { "title": "Home" } },
//!   "id=7": { "templatePath": "/detail.html", "templateData": { "id": 7 } },
//!   "format=json": { "jsonResponse": { "ok": true } }
//! }
//! ```
//!
//! The key is built from the query parameters sorted by name, then value.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::vfs::MergedVfs;

/// Suffix of the data file next to a template.
const DATA_SUFFIX: &str = ".cfg.json";

/// Entry selected for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData {
    /// Return this value as `application/json` instead of rendering.
    pub json_response: Option<Value>,
    /// Render this template instead of the requested one.
    pub template_path: Option<String>,
    /// Data handed to the template engine.
    pub template_data: Value,
}

impl RequestData {
    /// Look up the entry for `path` and `query`.
    ///
    /// A missing data file or key yields empty data; an unreadable or
    /// malformed file is an error.
    pub fn load(vfs: &MergedVfs, path: &str, query: &[(String, String)]) -> Result<Self> {
        let data_path = format!("{path}{DATA_SUFFIX}");
        let bytes = match vfs.read(&data_path) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(Self::default()),
            Err(e) => return Err(e).context("failed to read request data"),
        };

        let mut entries: Map<String, Value> = serde_json::from_slice(&bytes)
            .with_context(|| format!("`{data_path}` is not a JSON object"))?;

        Ok(match entries.remove(&request_key(query)) {
            Some(Value::Object(entry)) => Self::from_entry(entry),
            _ => Self::default(),
        })
    }

    fn from_entry(mut entry: Map<String, Value>) -> Self {
        Self {
            json_response: entry.remove("jsonResponse"),
            template_path: entry.remove("templatePath").map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            template_data: entry.remove("templateData").unwrap_or(Value::Null),
        }
    }
}

/// Canonical key for a query: `name=value` pairs sorted by name and value,
/// joined with `&`.
pub fn request_key(query: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    fn vfs_with(data: &str) -> (tempfile::TempDir, MergedVfs) {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join("page.html.cfg.json"), data).unwrap();
        let vfs = MergedVfs::new();
        vfs.mount("/", vec![temp.path().to_path_buf()]).unwrap();
        (temp, vfs)
    }

    #[test]
    fn test_request_key_sorting() {
        assert_eq!(request_key(&[]), "");
        assert_eq!(
            request_key(&pairs(&[("b", "2"), ("a", "9"), ("b", "1")])),
            "a=9&b=1&b=2"
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_temp, vfs) = vfs_with("{}");
        let data = RequestData::load(&vfs, "/other.html", &[]).unwrap();
        assert_eq!(data, RequestData::default());
    }

    #[test]
    fn test_entry_selected_by_query() {
        let (_temp, vfs) = vfs_with(
            &json!({
                "": { "templateData": { "title": "Home" } },
                "id=7&lang=de": { "templatePath": "/detail.html", "templateData": { "id": 7 } },
                "format=json": { "jsonResponse": [1, 2] }
            })
            .to_string(),
        );

        let data = RequestData::load(&vfs, "/page.html", &[]).unwrap();
        assert_eq!(data.template_data, json!({ "title": "Home" }));
        assert!(data.template_path.is_none());

        let query = pairs(&[("lang", "de"), ("id", "7")]);
        let data = RequestData::load(&vfs, "/page.html", &query).unwrap();
        assert_eq!(data.template_path.as_deref(), Some("/detail.html"));
        assert_eq!(data.template_data, json!({ "id": 7 }));

        let query = pairs(&[("format", "json")]);
        let data = RequestData::load(&vfs, "/page.html", &query).unwrap();
        assert_eq!(data.json_response, Some(json!([1, 2])));

        let query = pairs(&[("unknown", "1")]);
        let data = RequestData::load(&vfs, "/page.html", &query).unwrap();
        assert_eq!(data, RequestData::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let (_temp, vfs) = vfs_with("[1, 2");
        assert!(RequestData::load(&vfs, "/page.html", &[]).is_err());
    }
}
