//! Device-facing routes: telemetry ingestion and device registration.
//! Guarded by the shared device API key, not by user tokens.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::instrument;

use thermoband_domain::{
    CreatePatientRequest, IngestOutcome, RecordReadingRequest, RegisterDeviceOutcome,
    RegisterDeviceRequest, DEFAULT_INTERVAL_SECONDS,
};

use crate::auth::verify_api_key;
use crate::dto;
use crate::error::ApiError;
use crate::server::AppState;

/// POST /esp32/temperature
#[instrument(
    name = "IngestReading",
    skip(state, headers, request),
    fields(mac_address = %request.mac_address)
)]
pub async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<dto::IngestReadingRequest>,
) -> Response {
    if let Err(e) = verify_api_key(&headers, state.device_api_key.as_deref()) {
        return e.into_response();
    }

    let outcome = state
        .ingestion
        .record_reading(RecordReadingRequest {
            mac_address: request.mac_address,
            temperature: request.temperature,
            received_at: Instant::now(),
        })
        .await;

    match outcome {
        Ok(IngestOutcome::Accepted { reading, directive }) => (
            StatusCode::CREATED,
            Json(dto::IngestReadingResponse {
                message: Some("Temperature recorded".to_string()),
                error: None,
                reading: Some(reading.into()),
                interval: directive.interval_seconds,
                reset: directive.reset,
            }),
        )
            .into_response(),
        Ok(IngestOutcome::StorageFailed { directive, reason }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(dto::IngestReadingResponse {
                message: None,
                error: Some(reason),
                reading: None,
                interval: directive.interval_seconds,
                reset: directive.reset,
            }),
        )
            .into_response(),
        // Hard rejections still carry a usable directive pair; the defaults
        // apply because these paths never read the binding store.
        Err(e) => {
            let api_error = ApiError::from(e);
            (
                api_error.status,
                Json(dto::IngestReadingResponse {
                    message: None,
                    error: Some(api_error.message),
                    reading: None,
                    interval: DEFAULT_INTERVAL_SECONDS,
                    reset: false,
                }),
            )
                .into_response()
        }
    }
}

/// POST /esp32/add-patient
#[instrument(name = "ProvisionPatient", skip(state, headers, request))]
pub async fn add_patient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<dto::ProvisionPatientRequest>,
) -> Result<(StatusCode, Json<dto::PatientCreatedResponse>), ApiError> {
    verify_api_key(&headers, state.device_api_key.as_deref())?;

    let patient = state
        .patients
        .create_patient(CreatePatientRequest {
            user_id: request.user_id,
            name: request.name,
            age: request.age,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(dto::PatientCreatedResponse {
            message: "Patient added".to_string(),
            patient: patient.into(),
        }),
    ))
}

/// POST /esp32/register-device
#[instrument(
    name = "RegisterDevice",
    skip(state, headers, request),
    fields(mac_address = %request.mac_address)
)]
pub async fn register_device(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<dto::RegisterDeviceRequest>,
) -> Result<Response, ApiError> {
    verify_api_key(&headers, state.device_api_key.as_deref())?;

    let outcome = state
        .bindings
        .register_device(RegisterDeviceRequest {
            user_id: request.uid,
            mac_address: request.mac_address,
        })
        .await?;

    match outcome {
        RegisterDeviceOutcome::New(binding) => Ok((
            StatusCode::CREATED,
            Json(dto::RegisterDeviceResponse {
                outcome: "NEW".to_string(),
                binding: binding.into(),
            }),
        )
            .into_response()),
        RegisterDeviceOutcome::AlreadyOwned(binding) => Ok((
            StatusCode::OK,
            Json(dto::RegisterDeviceResponse {
                outcome: "ALREADY_OWNED".to_string(),
                binding: binding.into(),
            }),
        )
            .into_response()),
        RegisterDeviceOutcome::ClaimedByOther { mac_address } => Err(ApiError::conflict(format!(
            "Device {} is registered to another user",
            mac_address
        ))),
    }
}
