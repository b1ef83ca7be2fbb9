//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server resources (live-reload client, error page)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{error_page, live_reload_snippet};
//!
//! let script = live_reload_snippet(35729);
//! let page = error_page("Template Error", &format!("{err:#}"));
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};
    use crate::utils::html::escape;

    /// Variables for live-reload.js.
    pub struct LiveReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for LiveReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__DEVROOT_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Browser client of the live-reload channel.
    pub const LIVE_RELOAD_JS: Template<LiveReloadVars> =
        Template::new(include_str!("serve/live-reload.js"));

    /// Inline `<script>` element connecting to the reload endpoint on `ws_port`.
    pub fn live_reload_snippet(ws_port: u16) -> String {
        format!(
            "<script>{}</script>",
            LIVE_RELOAD_JS.render(&LiveReloadVars { ws_port })
        )
    }

    /// Variables for error.html. Both values are escaped on render.
    pub struct ErrorVars<'a> {
        pub title: &'a str,
        pub message: &'a str,
    }

    impl TemplateVars for ErrorVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__TITLE__", &escape(self.title))
                .replace("__MESSAGE__", &escape(self.message))
        }
    }

    const ERROR_HTML: &str = include_str!("serve/error.html");

    /// Error page for failed renders.
    pub fn error_page(title: &str, message: &str) -> String {
        Template::<ErrorVars<'_>>::new(ERROR_HTML).render(&ErrorVars { title, message })
    }
}

#[cfg(test)]
mod tests {
    use super::serve::*;

    #[test]
    fn test_live_reload_snippet_injects_port() {
        let snippet = live_reload_snippet(35730);
        assert!(snippet.starts_with("<script>"));
        assert!(snippet.ends_with("</script>"));
        assert!(snippet.contains("var port = 35730;"));
        assert!(snippet.contains("'live-reload'"));
        assert!(!snippet.contains("__DEVROOT_WS_PORT__"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let page = error_page("Template Error", "unexpected <tag> in `/index.html`");
        assert!(page.contains("<h1>Template Error</h1>"));
        assert!(page.contains("unexpected &lt;tag&gt;"));
        assert!(!page.contains("__MESSAGE__"));
    }
}
