//! Live reload broadcaster.
//!
//! Fan-out is best-effort: every channel owns a bounded queue drained by its
//! client's I/O thread, so a broadcast never blocks on a slow browser. A full
//! or disconnected queue drops that channel only.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use dashmap::DashMap;

use super::ReloadMessage;

pub type ChannelId = u64;

/// Outbound side of one connected client.
#[derive(Debug, Clone)]
pub struct ReloadChannel {
    tx: Sender<ReloadMessage>,
}

impl ReloadChannel {
    /// Create a channel and the receiver its I/O thread drains.
    pub fn new(capacity: usize) -> (Self, Receiver<ReloadMessage>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }

    fn try_deliver(&self, msg: ReloadMessage) -> Result<(), TrySendError<ReloadMessage>> {
        self.tx.try_send(msg)
    }
}

#[derive(Default)]
pub struct ReloadBroadcaster {
    channels: DashMap<ChannelId, ReloadChannel>,
    next_id: AtomicU64,
}

impl ReloadBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, channel: ReloadChannel) -> ChannelId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels.insert(id, channel);
        crate::debug!("reload"; "client #{} connected (total: {})", id, self.channels.len());
        id
    }

    /// Remove a channel. Idempotent.
    pub fn unregister(&self, id: ChannelId) -> bool {
        let removed = self.channels.remove(&id).is_some();
        if removed {
            crate::debug!("reload"; "client #{} disconnected (total: {})", id, self.channels.len());
        }
        removed
    }

    /// Send a reload to every channel. Returns the number reached.
    pub fn broadcast(&self) -> usize {
        self.send(ReloadMessage::Reload)
    }

    /// Send a keep-alive to every channel.
    pub fn ping(&self) -> usize {
        self.send(ReloadMessage::Ping)
    }

    /// Drop every channel; client threads see the disconnect and close.
    pub fn close_all(&self) {
        self.channels.clear();
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn send(&self, msg: ReloadMessage) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();

        // Shard read locks are held while iterating; removal happens after.
        for entry in &self.channels {
            match entry.value().try_deliver(msg) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    crate::debug!("reload"; "dropping client #{}: {}", entry.key(), e);
                    failed.push(*entry.key());
                }
            }
        }

        for id in failed {
            self.channels.remove(&id);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_broadcast_reaches_all() {
        let broadcaster = ReloadBroadcaster::new();
        let (a, rx_a) = ReloadChannel::new(4);
        let (b, rx_b) = ReloadChannel::new(4);
        broadcaster.register(a);
        broadcaster.register(b);

        assert_eq!(broadcaster.broadcast(), 2);
        assert_eq!(rx_a.try_recv().unwrap(), ReloadMessage::Reload);
        assert_eq!(rx_b.try_recv().unwrap(), ReloadMessage::Reload);
    }

    #[test]
    fn test_failed_channel_dropped_others_kept() {
        let broadcaster = ReloadBroadcaster::new();
        let (gone, rx_gone) = ReloadChannel::new(4);
        let (full, _rx_full) = ReloadChannel::new(1);
        let (ok, rx_ok) = ReloadChannel::new(4);
        broadcaster.register(gone);
        broadcaster.register(full);
        let ok_id = broadcaster.register(ok);
        drop(rx_gone);

        assert_eq!(broadcaster.broadcast(), 2);
        assert_eq!(broadcaster.len(), 2);

        // Second reload overflows the capacity-1 queue
        assert_eq!(broadcaster.broadcast(), 1);
        assert_eq!(broadcaster.len(), 1);
        assert_eq!(rx_ok.len(), 2);
        assert!(broadcaster.unregister(ok_id));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let broadcaster = ReloadBroadcaster::new();
        let (channel, _rx) = ReloadChannel::new(1);
        let id = broadcaster.register(channel);

        assert!(broadcaster.unregister(id));
        assert!(!broadcaster.unregister(id));
        assert_eq!(broadcaster.broadcast(), 0);
    }

    #[test]
    fn test_ping_and_close_all() {
        let broadcaster = ReloadBroadcaster::new();
        let (channel, rx) = ReloadChannel::new(2);
        broadcaster.register(channel);

        assert_eq!(broadcaster.ping(), 1);
        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Ping);

        broadcaster.close_all();
        assert!(broadcaster.is_empty());
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_concurrent_churn_keeps_long_lived_channel() {
        const BROADCASTS: usize = 500;

        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let (stable, stable_rx) = ReloadChannel::new(BROADCASTS);
        let stable_id = broadcaster.register(stable);
        let done = Arc::new(AtomicBool::new(false));

        let churners: Vec<_> = (0..4)
            .map(|_| {
                let broadcaster = Arc::clone(&broadcaster);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        let (channel, rx) = ReloadChannel::new(1);
                        let id = broadcaster.register(channel);
                        drop(rx);
                        broadcaster.unregister(id);
                        broadcaster.unregister(id);
                    }
                })
            })
            .collect();

        for _ in 0..BROADCASTS {
            assert!(broadcaster.broadcast() >= 1);
        }
        done.store(true, Ordering::Relaxed);
        for handle in churners {
            handle.join().unwrap();
        }

        assert_eq!(stable_rx.len(), BROADCASTS);
        assert!(broadcaster.unregister(stable_id));
    }
}
