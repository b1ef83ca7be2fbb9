//! Per-client WebSocket I/O.
//!
//! Each browser gets one thread that alternates between draining its
//! outbound queue and polling the socket with a short read timeout.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{Receiver, TryRecvError};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::HeaderValue;
use tungstenite::protocol::Message;
use tungstenite::{Error as WsError, WebSocket};

use super::{PONG, ReloadBroadcaster, ReloadChannel, ReloadMessage};

/// Subprotocol requested by the embedded client script.
const SUBPROTOCOL: &str = "live-reload";

/// Outbound queue depth per client.
const QUEUE_CAPACITY: usize = 16;

/// Socket poll interval between queue drains.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Upper bound on a client sending its upgrade request.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Complete the handshake and serve the client on its own thread.
pub(super) fn spawn_client(stream: TcpStream, broadcaster: Arc<ReloadBroadcaster>) {
    let spawned = std::thread::Builder::new()
        .name("reload-client".into())
        .spawn(move || serve_client(stream, &broadcaster));
    if let Err(e) = spawned {
        crate::log!("reload"; "failed to spawn client thread: {}", e);
    }
}

fn serve_client(stream: TcpStream, broadcaster: &ReloadBroadcaster) {
    let Some(mut ws) = handshake(stream, HANDSHAKE_TIMEOUT) else {
        return;
    };
    if let Err(e) = ws.get_ref().set_read_timeout(Some(READ_TIMEOUT)) {
        crate::debug!("reload"; "cannot set read timeout: {}", e);
        return;
    }

    let (channel, rx) = ReloadChannel::new(QUEUE_CAPACITY);
    let id = broadcaster.register(channel);

    while pump(&mut ws, &rx) {}

    broadcaster.unregister(id);
    let _ = ws.close(None);
    let _ = ws.flush();
}

/// Upgrade `stream`, giving up when the client stays silent for `timeout`.
fn handshake(stream: TcpStream, timeout: Duration) -> Option<WebSocket<TcpStream>> {
    if let Err(e) = stream.set_read_timeout(Some(timeout)) {
        crate::debug!("reload"; "cannot set handshake timeout: {}", e);
        return None;
    }
    match tungstenite::accept_hdr(stream, echo_subprotocol) {
        Ok(ws) => Some(ws),
        Err(e) => {
            crate::debug!("reload"; "handshake failed: {}", e);
            None
        }
    }
}

/// One round of I/O. Returns `false` once the client is gone.
fn pump(ws: &mut WebSocket<TcpStream>, rx: &Receiver<ReloadMessage>) -> bool {
    loop {
        match rx.try_recv() {
            Ok(msg) => {
                if let Err(e) = ws.send(Message::Text(msg.to_json().into())) {
                    crate::debug!("reload"; "send failed: {}", e);
                    return false;
                }
            }
            Err(TryRecvError::Empty) => break,
            // Broadcaster dropped this channel (shutdown or full queue)
            Err(TryRecvError::Disconnected) => return false,
        }
    }

    match ws.read() {
        Ok(Message::Text(text)) => {
            if text.as_str() != PONG {
                crate::debug!("reload"; "unexpected client message: {}", text.as_str());
            }
            true
        }
        Ok(Message::Close(_)) => false,
        Ok(_) => true,
        Err(WsError::Io(ref e))
            if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) =>
        {
            true
        }
        Err(_) => false,
    }
}

/// Accept the `live-reload` subprotocol when the client asks for it;
/// browsers refuse the connection otherwise.
#[allow(clippy::result_large_err)]
fn echo_subprotocol(request: &Request, mut response: Response) -> Result<Response, ErrorResponse> {
    let requested = request
        .headers()
        .get("Sec-WebSocket-Protocol")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|p| p.trim() == SUBPROTOCOL));

    if requested {
        response
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;

    #[test]
    fn test_silent_client_times_out_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let started = Instant::now();
        assert!(handshake(stream, Duration::from_millis(100)).is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
