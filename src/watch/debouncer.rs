use std::time::{Duration, Instant};

use super::ChangeSet;
use crate::vfs::path::strip_prefix;

/// Wait used while nothing is pending.
pub(super) const IDLE_TICK: Duration = Duration::from_millis(500);

/// Pure debouncer: only handles timing and path deduplication.
///
/// The quiet window slides with every event; `max_wait` since the first
/// event bounds it so constant churn still flushes.
pub(super) struct Debouncer {
    pub(super) changes: ChangeSet,
    pub(super) first_event: Option<Instant>,
    pub(super) last_event: Option<Instant>,
    quiet: Duration,
    max_wait: Duration,
}

impl Debouncer {
    pub(super) fn new(quiet: Duration, max_wait: Duration) -> Self {
        Self {
            changes: ChangeSet::default(),
            first_event: None,
            last_event: None,
            quiet,
            max_wait: max_wait.max(quiet),
        }
    }

    /// Record a changed logical path.
    pub(super) fn add(&mut self, path: String) {
        if self.changes.insert(path) {
            crate::debug!("watch"; "pending: {}", self.changes.len());
        }
        self.touch();
    }

    /// Replace everything under `prefix` by `prefix` itself.
    pub(super) fn widen(&mut self, prefix: &str) {
        self.changes
            .retain(|path| path == prefix || strip_prefix(path, prefix).is_none());
        self.changes.insert(prefix.to_string());
        self.touch();
    }

    fn touch(&mut self) {
        let now = Instant::now();
        self.first_event.get_or_insert(now);
        self.last_event = Some(now);
    }

    pub(super) fn is_ready(&self) -> bool {
        let (Some(first), Some(last)) = (self.first_event, self.last_event) else {
            return false;
        };
        if self.changes.is_empty() {
            return false;
        }
        last.elapsed() >= self.quiet || first.elapsed() >= self.max_wait
    }

    /// Take the accumulated set once the window closed.
    pub(super) fn take_if_ready(&mut self) -> Option<ChangeSet> {
        if !self.is_ready() {
            return None;
        }
        self.first_event = None;
        self.last_event = None;
        Some(std::mem::take(&mut self.changes))
    }

    /// Precise wait until the window can close.
    pub(super) fn sleep_duration(&self) -> Duration {
        let (Some(first), Some(last)) = (self.first_event, self.last_event) else {
            return IDLE_TICK;
        };

        let quiet_remaining = self.quiet.saturating_sub(last.elapsed());
        let max_remaining = self.max_wait.saturating_sub(first.elapsed());

        quiet_remaining
            .min(max_remaining)
            .min(IDLE_TICK)
            .max(Duration::from_millis(1))
    }
}
