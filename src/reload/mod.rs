//! Live reload.
//!
//! ```text
//! RebuildCoordinator ─► ReloadBroadcaster ─► ReloadChannel queue ─► client I/O thread ─► browser
//!                              ▲
//! ReloadServer (accept) ───────┘ register / unregister
//! ```
//!
//! # Modules
//!
//! - `broadcaster` - concurrent channel set and best-effort fan-out
//! - `channel` - WebSocket handshake and per-client I/O
//! - `message` - JSON wire messages (`reload`, `ping`)
//! - `server` - acceptor and keep-alive threads

pub mod broadcaster;
mod channel;
pub mod message;
pub mod server;

pub use broadcaster::{ReloadBroadcaster, ReloadChannel};
pub use message::{PONG, ReloadMessage};
pub use server::ReloadServer;
