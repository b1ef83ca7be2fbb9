//! Request dispatch over the merged filesystem.
//!
//! ```text
//! url ─► logical path ─► directory? ─► index.html
//!                     ─► template?  ─► .cfg.json entry ─► jsonResponse | render
//!                     ─► otherwise  ─► vfs.read
//! ```

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tiny_http::Request;

use super::data::RequestData;
use super::path::{index_of, parse_url};
use super::response;
use crate::rebuild::{TemplateEngine, TemplateError};
use crate::vfs::{MergedVfs, path::normalize};

/// What to send for one request.
#[derive(Debug)]
pub enum Reply {
    Resource { path: String, body: Vec<u8> },
    Rendered(String),
    Json(Value),
    NotFound,
    Error { title: &'static str, error: anyhow::Error },
}

/// Shared by every request-pool task.
#[derive(Clone)]
pub struct Handler {
    vfs: Arc<MergedVfs>,
    templates: Arc<dyn TemplateEngine>,
    ws_port: Option<u16>,
}

impl Handler {
    pub fn new(
        vfs: Arc<MergedVfs>,
        templates: Arc<dyn TemplateEngine>,
        ws_port: Option<u16>,
    ) -> Self {
        Self {
            vfs,
            templates,
            ws_port,
        }
    }

    pub fn handle(&self, request: Request) -> Result<()> {
        let reply = self.reply(request.url());
        self.send(request, reply)
    }

    /// Decide the reply for `url` without touching the connection.
    pub fn reply(&self, url: &str) -> Reply {
        let target = match parse_url(url) {
            Ok(target) => target,
            Err(e) => {
                crate::debug!("serve"; "rejected {}: {}", url, e);
                return Reply::NotFound;
            }
        };
        let path = self.directory_index(target.path);

        if self.templates.accepts(&path) {
            return self.render(&path, &target.query);
        }

        match self.vfs.read(&path) {
            Ok(body) => Reply::Resource { path, body },
            Err(e) if e.is_not_found() => Reply::NotFound,
            Err(e) => Reply::Error {
                title: "Read Error",
                error: e.into(),
            },
        }
    }

    /// Map a directory to its `index.html`.
    fn directory_index(&self, path: String) -> String {
        match self.vfs.resolve(&path) {
            Ok(Some(location)) if location.path.is_dir() => index_of(&path),
            _ => path,
        }
    }

    fn render(&self, path: &str, query: &[(String, String)]) -> Reply {
        let data = match RequestData::load(&self.vfs, path, query) {
            Ok(data) => data,
            Err(error) => {
                return Reply::Error {
                    title: "Request Data Error",
                    error,
                };
            }
        };

        if let Some(json) = data.json_response {
            return Reply::Json(json);
        }

        let template = match data.template_path.as_deref().map(normalize) {
            None => path.to_string(),
            Some(Ok(template)) => template,
            Some(Err(_)) => return Reply::NotFound,
        };

        match self.templates.render(&template, &data.template_data) {
            Ok(html) => Reply::Rendered(html),
            Err(TemplateError::NotFound(_)) => Reply::NotFound,
            Err(e) => Reply::Error {
                title: "Template Error",
                error: e.into(),
            },
        }
    }

    fn send(&self, request: Request, reply: Reply) -> Result<()> {
        match reply {
            Reply::Resource { path, body } => {
                response::respond_resource(request, &path, body, self.ws_port)
            }
            Reply::Rendered(html) => response::respond_rendered(request, html, self.ws_port),
            Reply::Json(value) => response::respond_json(request, &value),
            Reply::NotFound => response::respond_not_found(request),
            Reply::Error { title, error } => {
                crate::log!("serve"; "{}: {:#}", title.to_ascii_lowercase(), error);
                response::respond_error(request, title, &error, self.ws_port)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebuild::{NullTemplates, StaticTemplates};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct Site {
        _temp: TempDir,
        handler: Handler,
    }

    fn site(static_engine: bool) -> Site {
        let temp = TempDir::new().unwrap();
        let web = temp.path().join("web");
        let generated = temp.path().join("gen");
        fs::create_dir_all(web.join("docs")).unwrap();
        fs::create_dir_all(&generated).unwrap();

        fs::write(web.join("index.html"), "<h1>{{title}}</h1>").unwrap();
        fs::write(
            web.join("index.html.cfg.json"),
            json!({
                "": { "templateData": { "title": "Home" } },
                "api=1": { "jsonResponse": { "ok": true } },
                "alt=1": { "templatePath": "/docs/index.html", "templateData": { "title": "Alt" } },
                "escape=1": { "templatePath": "/../../etc/passwd" }
            })
            .to_string(),
        )
        .unwrap();
        fs::write(web.join("docs/index.html"), "<p>{{title}}</p>").unwrap();
        fs::write(web.join("broken.html"), [0xff, 0xfe]).unwrap();
        fs::write(web.join("app.js"), "source").unwrap();
        fs::write(generated.join("app.js"), "generated").unwrap();
        fs::write(generated.join("style.css"), "body{}").unwrap();

        let vfs = Arc::new(MergedVfs::new());
        vfs.mount("/", vec![web, generated]).unwrap();
        let templates: Arc<dyn TemplateEngine> = if static_engine {
            Arc::new(StaticTemplates::new(vfs.clone(), &["html".into()]))
        } else {
            Arc::new(NullTemplates)
        };

        Site {
            _temp: temp,
            handler: Handler::new(vfs, templates, Some(35729)),
        }
    }

    #[test]
    fn test_root_renders_index_with_data() {
        let site = site(true);
        let Reply::Rendered(html) = site.handler.reply("/") else {
            panic!("expected a rendered page");
        };
        assert_eq!(html, "<h1>Home</h1>");
    }

    #[test]
    fn test_directory_without_slash_renders_index() {
        let site = site(true);
        assert!(matches!(site.handler.reply("/docs"), Reply::Rendered(html) if html == "<p>{{title}}</p>"));
    }

    #[test]
    fn test_json_response_and_template_path() {
        let site = site(true);
        assert!(matches!(
            site.handler.reply("/?api=1"),
            Reply::Json(value) if value == json!({ "ok": true })
        ));
        assert!(matches!(
            site.handler.reply("/index.html?alt=1"),
            Reply::Rendered(html) if html == "<p>Alt</p>"
        ));
        assert!(matches!(site.handler.reply("/?escape=1"), Reply::NotFound));
    }

    #[test]
    fn test_first_root_wins_for_static_files() {
        let site = site(true);
        let Reply::Resource { path, body } = site.handler.reply("/app.js") else {
            panic!("expected a resource");
        };
        assert_eq!(path, "/app.js");
        assert_eq!(body, b"source");
        assert!(matches!(
            site.handler.reply("/style.css"),
            Reply::Resource { body, .. } if body == b"body{}"
        ));
    }

    #[test]
    fn test_not_found_and_traversal() {
        let site = site(true);
        assert!(matches!(site.handler.reply("/missing.css"), Reply::NotFound));
        assert!(matches!(site.handler.reply("/missing.html"), Reply::NotFound));
        assert!(matches!(site.handler.reply("/../../etc/passwd"), Reply::NotFound));
    }

    #[test]
    fn test_template_error_is_500() {
        let site = site(true);
        assert!(matches!(
            site.handler.reply("/broken.html"),
            Reply::Error { title: "Template Error", .. }
        ));
    }

    #[test]
    fn test_null_engine_serves_templates_raw() {
        let site = site(false);
        assert!(matches!(
            site.handler.reply("/"),
            Reply::Resource { body, .. } if body == b"<h1>{{title}}</h1>"
        ));
    }
}
