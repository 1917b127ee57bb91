use serde::{Deserialize, Serialize};

/// Default sampling interval communicated to a device when nothing better is
/// known (fresh bindings, storage-failure fallback).
pub const DEFAULT_INTERVAL_SECONDS: i32 = 300;

/// Sampling directive returned to a device after every ingestion attempt.
///
/// `interval_seconds` is advisory; the server only enforces the throttle
/// gate's fixed minimum window. `reset` tells the device to wipe its local
/// state and re-enter pairing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub interval_seconds: i32,
    pub reset: bool,
}

impl Default for Directive {
    fn default() -> Self {
        Directive {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            reset: false,
        }
    }
}
