//! `[watch]` section configuration.
//!
//! ```toml
//! [watch]
//! backend = "auto"        # auto | native | poll
//! debounce_ms = 150       # quiet period before a batch is flushed
//! max_wait_ms = 1500      # upper bound on how long a batch may grow
//! poll_interval_ms = 500  # scan interval of the poll backend
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Change notification backend.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Native notifications, polling when unavailable.
    #[default]
    Auto,
    /// Native notifications only.
    Native,
    /// Periodic directory scans.
    Poll,
}

/// Watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub backend: BackendKind,
    pub debounce_ms: u64,
    pub max_wait_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Auto,
            debounce_ms: 150,
            max_wait_ms: 1500,
            poll_interval_ms: 500,
        }
    }
}

impl WatchConfig {
    pub const DEBOUNCE_MS: FieldPath = FieldPath::new("watch.debounce_ms");
    pub const MAX_WAIT_MS: FieldPath = FieldPath::new("watch.max_wait_ms");
    pub const POLL_INTERVAL_MS: FieldPath = FieldPath::new("watch.poll_interval_ms");

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.debounce_ms == 0 {
            diag.error(Self::DEBOUNCE_MS, "must be greater than 0");
        }
        if self.max_wait_ms < self.debounce_ms {
            diag.error_with_hint(
                Self::MAX_WAIT_MS,
                format!(
                    "{}ms is shorter than the debounce window ({}ms)",
                    self.max_wait_ms, self.debounce_ms
                ),
                "set `max_wait_ms` to at least `debounce_ms`",
            );
        }
        if self.poll_interval_ms == 0 {
            diag.error(Self::POLL_INTERVAL_MS, "must be greater than 0");
        }
    }
}
