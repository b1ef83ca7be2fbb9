//! Live reload message protocol.
//!
//! JSON text frames sent from the server to browser clients:
//!
//! - `{"kind":"reload"}`: reload the page
//! - `{"kind":"ping"}`: keep-alive; the client answers with the text `pong`

use serde::Serialize;

/// Reply expected from clients after a ping.
pub const PONG: &str = "pong";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReloadMessage {
    Reload,
    Ping,
}

impl ReloadMessage {
    /// Serialize to JSON string
    pub fn to_json(self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| r#"{"kind":"reload"}"#.to_string())
    }
}
