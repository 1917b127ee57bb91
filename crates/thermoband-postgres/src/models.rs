use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thermoband_domain::{DeviceBinding, Patient, Reading};

/// Binding row for PostgreSQL storage with timestamp metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRow {
    pub mac_address: String,
    pub user_id: String,
    pub patient_id: Option<String>,
    pub interval_seconds: i32,
    pub reset_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BindingRow> for DeviceBinding {
    fn from(row: BindingRow) -> Self {
        DeviceBinding {
            mac_address: row.mac_address,
            user_id: row.user_id,
            patient_id: row.patient_id,
            interval_seconds: row.interval_seconds,
            reset_requested: row.reset_requested,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

/// Patient row for PostgreSQL storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRow {
    pub patient_id: String,
    pub user_id: String,
    pub patient_name: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            patient_id: row.patient_id,
            user_id: row.user_id,
            name: row.patient_name,
            age: row.age,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

/// Reading row for PostgreSQL storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRow {
    pub reading_id: i64,
    pub patient_id: Option<String>,
    pub temperature: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            reading_id: row.reading_id,
            patient_id: row.patient_id,
            temperature: row.temperature,
            recorded_at: row.recorded_at,
        }
    }
}
