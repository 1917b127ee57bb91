use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Patient record, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub user_id: String,
    pub name: String,
    pub age: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a patient with a pre-generated identifier.
#[derive(Debug, Clone)]
pub struct CreatePatientInput {
    pub patient_id: String,
    pub user_id: String,
    pub name: String,
    pub age: i32,
}
