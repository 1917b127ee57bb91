//! Wire types. Field names keep the camelCase contract the device firmware
//! and clinical frontend already speak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thermoband_domain::{DeviceBinding, Patient, Reading};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReadingRequest {
    pub mac_address: String,
    pub temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub reading_id: i64,
    pub patient_id: Option<String>,
    pub temperature: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<Reading> for ReadingDto {
    fn from(reading: Reading) -> Self {
        ReadingDto {
            reading_id: reading.reading_id,
            patient_id: reading.patient_id,
            temperature: reading.temperature,
            recorded_at: reading.recorded_at,
        }
    }
}

/// Every ingestion answer carries the directive pair, success or not, so
/// the device's reporting loop never stalls.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReadingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<ReadingDto>,
    pub interval: i32,
    pub reset: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub uid: String,
    pub mac_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingDto {
    pub mac_address: String,
    pub patient_id: Option<String>,
    pub interval: i32,
    pub reset_requested: bool,
}

impl From<DeviceBinding> for BindingDto {
    fn from(binding: DeviceBinding) -> Self {
        BindingDto {
            mac_address: binding.mac_address,
            patient_id: binding.patient_id,
            interval: binding.interval_seconds,
            reset_requested: binding.reset_requested,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    pub outcome: String,
    pub binding: BindingDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub age: i32,
}

/// Provisioning-time patient creation, with the owning user named
/// explicitly instead of resolved from a token.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionPatientRequest {
    pub user_id: String,
    pub name: String,
    pub age: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    pub patient_id: String,
    pub name: String,
    pub age: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Patient> for PatientDto {
    fn from(patient: Patient) -> Self {
        PatientDto {
            patient_id: patient.patient_id,
            name: patient.name,
            age: patient.age,
            created_at: patient.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientCreatedResponse {
    pub message: String,
    pub patient: PatientDto,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDeviceRequest {
    pub patient_id: String,
    pub mac_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetDeviceRequest {
    pub mac_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetIntervalRequest {
    pub mac_address: String,
    pub interval: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceForPatientResponse {
    pub mac_address: Option<String>,
}
