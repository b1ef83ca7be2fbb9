//! Response body processing.

use crate::embed::serve::live_reload_snippet;
use crate::utils::html::insert_before_body_end;
use crate::utils::mime;

/// Inject the live-reload client if the body is HTML and reload is enabled.
pub fn maybe_inject_live_reload(body: Vec<u8>, content_type: &str, ws_port: Option<u16>) -> Vec<u8> {
    match (mime::is_html(content_type), ws_port) {
        (true, Some(port)) => insert_before_body_end(&body, live_reload_snippet(port).as_bytes()),
        _ => body,
    }
}
