//! Clinical-user routes for the binding lifecycle. Every route resolves the
//! caller from a bearer token first.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::instrument;

use thermoband_domain::{AssignDeviceRequest, RequestResetRequest, SetIntervalRequest};

use crate::auth::extract_user_id;
use crate::dto;
use crate::error::ApiError;
use crate::server::AppState;

/// POST /devices/assign
#[instrument(
    name = "AssignDevice",
    skip(state, headers, request),
    fields(patient_id = %request.patient_id, mac_address = %request.mac_address)
)]
pub async fn assign_device(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<dto::AssignDeviceRequest>,
) -> Result<(StatusCode, Json<dto::MessageResponse>), ApiError> {
    let user_id = extract_user_id(&headers, state.auth.as_ref())?;

    state
        .bindings
        .assign_device(AssignDeviceRequest {
            user_id,
            patient_id: request.patient_id,
            mac_address: request.mac_address,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(dto::MessageResponse {
            message: "Device assigned to patient successfully".to_string(),
        }),
    ))
}

/// POST /devices/reset
///
/// Flags intent only; the binding is destroyed after the device has been
/// told on its next report.
#[instrument(
    name = "RequestReset",
    skip(state, headers, request),
    fields(mac_address = %request.mac_address)
)]
pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<dto::ResetDeviceRequest>,
) -> Result<Json<dto::MessageResponse>, ApiError> {
    extract_user_id(&headers, state.auth.as_ref())?;

    state
        .bindings
        .request_reset(RequestResetRequest {
            mac_address: request.mac_address,
        })
        .await?;

    Ok(Json(dto::MessageResponse {
        message: "Reset requested, pending device acknowledgment".to_string(),
    }))
}

/// POST /devices/interval
#[instrument(
    name = "SetInterval",
    skip(state, headers, request),
    fields(mac_address = %request.mac_address, interval = request.interval)
)]
pub async fn set_interval(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<dto::SetIntervalRequest>,
) -> Result<Json<dto::MessageResponse>, ApiError> {
    extract_user_id(&headers, state.auth.as_ref())?;

    state
        .bindings
        .set_interval(SetIntervalRequest {
            mac_address: request.mac_address,
            interval_seconds: request.interval,
        })
        .await?;

    Ok(Json(dto::MessageResponse {
        message: "Interval updated successfully".to_string(),
    }))
}

/// GET /devices/unassigned
#[instrument(name = "ListUnassignedDevices", skip(state, headers))]
pub async fn list_unassigned(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ApiError> {
    extract_user_id(&headers, state.auth.as_ref())?;

    let devices = state.bindings.list_unassigned_devices().await?;

    Ok(Json(
        devices
            .into_iter()
            .map(|binding| binding.mac_address)
            .collect(),
    ))
}
