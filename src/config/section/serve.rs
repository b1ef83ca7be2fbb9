//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5280                 # HTTP port number
//! live_reload = true          # Inject the reload client into HTML responses
//! reload_port = 35729         # WebSocket port for reload notifications
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Push reload notifications to connected browsers.
    pub live_reload: bool,

    /// First port tried for the WebSocket endpoint; the next free one is
    /// used when taken.
    pub reload_port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5280,
            live_reload: true,
            reload_port: 35729,
        }
    }
}

impl ServeConfig {
    pub const RELOAD_PORT: FieldPath = FieldPath::new("serve.reload_port");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.live_reload && self.port != 0 && self.port == self.reload_port {
            diag.error_with_hint(
                Self::RELOAD_PORT,
                format!("live reload cannot share the HTTP port {}", self.port),
                "pick a different `reload_port`",
            );
        }
    }
}
