use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directive::Directive;

/// Device–patient association record, keyed by the device hardware address.
///
/// `patient_id` is null exactly while the device sits in the unassigned
/// pool. `reset_requested` is a transient flag cleared by the reset
/// workflow once the device has acknowledged the directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBinding {
    pub mac_address: String,
    pub user_id: String,
    pub patient_id: Option<String>,
    pub interval_seconds: i32,
    pub reset_requested: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeviceBinding {
    pub fn directive(&self) -> Directive {
        Directive {
            interval_seconds: self.interval_seconds,
            reset: self.reset_requested,
        }
    }
}

/// Input for creating a fresh binding in the unassigned pool.
#[derive(Debug, Clone)]
pub struct CreateBindingInput {
    pub mac_address: String,
    pub user_id: String,
}

/// Outcome of a device registration attempt.
///
/// Callers must branch on this rather than treating any non-error return as
/// a fresh registration.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterDeviceOutcome {
    /// A new binding row was created for this user.
    New(DeviceBinding),
    /// The device was already registered by the same user; nothing changed.
    AlreadyOwned(DeviceBinding),
    /// The device is claimed by a different user.
    ClaimedByOther { mac_address: String },
}
