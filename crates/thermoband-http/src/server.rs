use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use thermoband_domain::{BindingService, IngestionService, PatientService};

use crate::auth::AuthTokenProvider;
use crate::dto::MessageResponse;
use crate::{binding_handler, patient_handler, telemetry_handler};

/// Application state shared across handlers
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub bindings: Arc<BindingService>,
    pub patients: Arc<PatientService>,
    pub auth: Arc<dyn AuthTokenProvider>,
    /// Shared secret expected from device firmware; None disables the check.
    pub device_api_key: Option<String>,
}

async fn health() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Health Monitoring Backend API is running".to_string(),
    })
}

/// Create the REST API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Device-facing endpoints (API key, no user token)
        .route("/esp32/temperature", post(telemetry_handler::ingest_reading))
        .route(
            "/esp32/register-device",
            post(telemetry_handler::register_device),
        )
        .route("/esp32/add-patient", post(telemetry_handler::add_patient))
        // Clinical endpoints (bearer token)
        .route(
            "/patients",
            post(patient_handler::create_patient).get(patient_handler::list_patients),
        )
        .route(
            "/patients/{patient_id}",
            get(patient_handler::get_patient).delete(patient_handler::delete_patient),
        )
        .route(
            "/patients/{patient_id}/readings",
            get(patient_handler::patient_readings),
        )
        .route(
            "/patients/{patient_id}/device",
            get(patient_handler::patient_device),
        )
        .route("/devices/assign", post(binding_handler::assign_device))
        .route("/devices/reset", post(binding_handler::request_reset))
        .route("/devices/interval", post(binding_handler::set_interval))
        .route("/devices/unassigned", get(binding_handler::list_unassigned))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router until the shutdown token fires.
pub async fn serve(
    router: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
