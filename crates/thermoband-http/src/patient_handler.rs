//! Clinical-user routes for patient records and their device/reading views.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::instrument;

use thermoband_domain::CreatePatientRequest;

use crate::auth::extract_user_id;
use crate::dto;
use crate::error::ApiError;
use crate::server::AppState;

/// POST /patients
#[instrument(name = "CreatePatient", skip(state, headers, request))]
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<dto::CreatePatientRequest>,
) -> Result<(StatusCode, Json<dto::PatientCreatedResponse>), ApiError> {
    let user_id = extract_user_id(&headers, state.auth.as_ref())?;

    let patient = state
        .patients
        .create_patient(CreatePatientRequest {
            user_id,
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

/// GET /patients
#[instrument(name = "ListPatients", skip(state, headers))]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<dto::PatientDto>>, ApiError> {
    let user_id = extract_user_id(&headers, state.auth.as_ref())?;

    let patients = state.patients.list_patients(&user_id).await?;

    Ok(Json(patients.into_iter().map(Into::into).collect()))
}

/// GET /patients/{patient_id}
#[instrument(name = "GetPatient", skip(state, headers), fields(patient_id = %patient_id))]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(patient_id): Path<String>,
) -> Result<Json<dto::PatientDto>, ApiError> {
    let user_id = extract_user_id(&headers, state.auth.as_ref())?;

    let patient = state.patients.get_patient(&user_id, &patient_id).await?;

    Ok(Json(patient.into()))
}

/// DELETE /patients/{patient_id}
#[instrument(name = "DeletePatient", skip(state, headers), fields(patient_id = %patient_id))]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(patient_id): Path<String>,
) -> Result<Json<dto::MessageResponse>, ApiError> {
    let user_id = extract_user_id(&headers, state.auth.as_ref())?;

    state.patients.delete_patient(&user_id, &patient_id).await?;

    Ok(Json(dto::MessageResponse {
        message: "Patient deleted".to_string(),
    }))
}

/// GET /patients/{patient_id}/readings
#[instrument(name = "PatientReadings", skip(state, headers), fields(patient_id = %patient_id))]
pub async fn patient_readings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<dto::ReadingDto>>, ApiError> {
    let user_id = extract_user_id(&headers, state.auth.as_ref())?;

    let readings = state
        .patients
        .patient_readings(&user_id, &patient_id)
        .await?;

    Ok(Json(readings.into_iter().map(Into::into).collect()))
}

/// GET /patients/{patient_id}/device
#[instrument(name = "PatientDevice", skip(state, headers), fields(patient_id = %patient_id))]
pub async fn patient_device(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(patient_id): Path<String>,
) -> Result<Json<dto::DeviceForPatientResponse>, ApiError> {
    let user_id = extract_user_id(&headers, state.auth.as_ref())?;

    let mac_address = state
        .bindings
        .device_for_patient(&user_id, &patient_id)
        .await?;

    Ok(Json(dto::DeviceForPatientResponse { mac_address }))
}
