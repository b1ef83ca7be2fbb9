//! HTTP response handlers.

use anyhow::{Result, anyhow};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::content::maybe_inject_live_reload;
use crate::utils::mime::{self, types::{HTML, JSON, PLAIN}};

/// Respond with a resource read from the VFS, injecting the reload client
/// into HTML.
pub fn respond_resource(
    request: Request,
    logical: &str,
    body: Vec<u8>,
    ws_port: Option<u16>,
) -> Result<()> {
    let content_type = mime::from_logical(logical);
    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }
    let body = maybe_inject_live_reload(body, content_type, ws_port);
    send_body(request, 200, content_type, body)
}

/// Respond with a rendered template.
pub fn respond_rendered(request: Request, html: String, ws_port: Option<u16>) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, HTML);
    }
    let body = maybe_inject_live_reload(html.into_bytes(), HTML, ws_port);
    send_body(request, 200, HTML, body)
}

/// Respond with a `jsonResponse` value from the request data.
pub fn respond_json(request: Request, value: &serde_json::Value) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, JSON);
    }
    send_body(request, 200, JSON, serde_json::to_vec(value)?)
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, PLAIN);
    }
    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with an error page (500), with live reload so the page recovers
/// once the cause is fixed.
pub fn respond_error(
    request: Request,
    title: &str,
    error: &anyhow::Error,
    ws_port: Option<u16>,
) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 500, HTML);
    }
    let page = crate::embed::serve::error_page(title, &format!("{error:#}"));
    let body = maybe_inject_live_reload(page.into_bytes(), HTML, ws_port);
    send_body(request, 500, HTML, body)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &str) -> Result<()> {
    let response = Response::empty(StatusCode(status)).with_header(content_type_header(content_type)?);
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(content_type_header(content_type)?)
        .with_header(no_cache_header()?);
    request.respond(response)?;
    Ok(())
}

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value)
        .map_err(|()| anyhow!("invalid Content-Type `{value}`"))
}

fn no_cache_header() -> Result<Header> {
    Header::from_bytes("Cache-Control", "no-cache")
        .map_err(|()| anyhow!("invalid Cache-Control header"))
}
