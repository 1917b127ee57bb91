use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Minimum time a device must wait between accepted readings.
pub const MIN_ACCEPT_WINDOW: Duration = Duration::from_secs(10);

/// Per-device rate gate consulted by the ingestion pipeline before any
/// storage I/O happens.
#[cfg_attr(test, mockall::automock)]
pub trait ThrottleGate: Send + Sync {
    /// Accept or reject a reading arriving at `now`. Acceptance records
    /// `now` as the device's last-accepted timestamp; rejection mutates
    /// nothing.
    fn should_accept(&self, mac_address: &str, now: Instant) -> bool;
}

/// Process-local throttle gate over a concurrent map.
///
/// State does not survive restarts: the first reading after a restart is
/// always accepted. Keys are the device identifier exactly as received,
/// with no normalization.
pub struct InMemoryThrottleGate {
    window: Duration,
    last_accepted: DashMap<String, Instant>,
}

impl InMemoryThrottleGate {
    pub fn new(window: Duration) -> Self {
        InMemoryThrottleGate {
            window,
            last_accepted: DashMap::new(),
        }
    }

    /// Number of devices currently tracked.
    pub fn tracked_devices(&self) -> usize {
        self.last_accepted.len()
    }
}

impl Default for InMemoryThrottleGate {
    fn default() -> Self {
        Self::new(MIN_ACCEPT_WINDOW)
    }
}

impl ThrottleGate for InMemoryThrottleGate {
    fn should_accept(&self, mac_address: &str, now: Instant) -> bool {
        // The entry guard holds the shard lock for this key, making the
        // check-and-record step atomic per device.
        match self.last_accepted.entry(mac_address.to_string()) {
            Entry::Occupied(mut occupied) => {
                let elapsed = now.saturating_duration_since(*occupied.get());
                if elapsed >= self.window {
                    occupied.insert(now);
                    true
                } else {
                    debug!(
                        mac_address = %mac_address,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "reading rejected by throttle gate"
                    );
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
        }
    }
}
