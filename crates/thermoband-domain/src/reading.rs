use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable temperature reading, produced only by successful ingestion.
///
/// `patient_id` is null for readings reported while the device was
/// registered but unassigned; those carry no patient attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub reading_id: i64,
    pub patient_id: Option<String>,
    pub temperature: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Input for persisting a new reading. The repository stamps `recorded_at`.
#[derive(Debug, Clone)]
pub struct NewReading {
    pub patient_id: Option<String>,
    pub temperature: f64,
}
