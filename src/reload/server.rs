//! WebSocket Server for Live Reload
//!
//! Runs on its own port next to the HTTP server. An acceptor thread hands
//! every connection to a client I/O thread; a keep-alive thread pings all
//! clients periodically.

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Result;

use super::ReloadBroadcaster;
use super::channel::spawn_client;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Acceptor poll interval.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Interval between keep-alive pings.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Running live-reload endpoint.
pub struct ReloadServer {
    port: u16,
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl ReloadServer {
    /// Bind `interface:base_port` (or the next free port) and start serving.
    pub fn start(
        interface: IpAddr,
        base_port: u16,
        broadcaster: Arc<ReloadBroadcaster>,
    ) -> Result<Self> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        listener.set_nonblocking(true)?;

        let stop = Arc::new(AtomicBool::new(false));
        let acceptor = {
            let stop = Arc::clone(&stop);
            let broadcaster = Arc::clone(&broadcaster);
            std::thread::Builder::new()
                .name("reload-accept".into())
                .spawn(move || accept_loop(&listener, &broadcaster, &stop))?
        };
        let keepalive = {
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("reload-ping".into())
                .spawn(move || keepalive_loop(&broadcaster, &stop))?
        };

        Ok(Self {
            port,
            stop,
            threads: vec![acceptor, keepalive],
        })
    }

    /// Port actually bound.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting and pinging; joins the background threads.
    pub fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.threads {
            let _ = handle.join();
        }
    }
}

fn accept_loop(listener: &TcpListener, broadcaster: &Arc<ReloadBroadcaster>, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("reload"; "client connected: {}", addr);
                // Handshake and client I/O use blocking reads with a timeout
                let _ = stream.set_nonblocking(false);
                spawn_client(stream, Arc::clone(broadcaster));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                crate::log!("reload"; "accept error: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn keepalive_loop(broadcaster: &ReloadBroadcaster, stop: &AtomicBool) {
    let mut last_ping = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(ACCEPT_POLL);
        if last_ping.elapsed() >= PING_INTERVAL {
            broadcaster.ping();
            last_ping = Instant::now();
        }
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
