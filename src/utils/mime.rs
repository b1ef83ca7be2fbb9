//! MIME type detection for served resources.
//!
//! Logical paths are plain `/`-separated strings, so detection works on the
//! extension of the last segment rather than on a `Path`.

/// Common MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const SOURCE_MAP: &str = "application/json";

    pub const SVG: &str = "image/svg+xml";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const ICO: &str = "image/x-icon";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const EOT: &str = "application/vnd.ms-fontobject";

    pub const WASM: &str = "application/wasm";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Guess the MIME type of a logical path (e.g. `/css/site.css`).
pub fn from_logical(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    from_extension(ext.as_deref())
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("map") => types::SOURCE_MAP,
        Some("xml") => types::XML,
        Some("txt") => types::PLAIN,

        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("ico") => types::ICO,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,
        Some("otf") => types::OTF,
        Some("eot") => types::EOT,

        Some("wasm") => types::WASM,
        _ => types::OCTET_STREAM,
    }
}

/// Check if the MIME type is HTML (live-reload injection target).
pub fn is_html(mime: &str) -> bool {
    mime.starts_with("text/html")
}
