use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use thermoband_domain::DomainError;

use crate::dto::ErrorResponse;

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

/// Translate a domain error to the HTTP status it surfaces as.
impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let status = match &error {
            DomainError::ValidationError(_) | DomainError::InvalidInterval(_) => {
                StatusCode::BAD_REQUEST
            }
            DomainError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            DomainError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            DomainError::DeviceNotRegistered(_)
            | DomainError::DeviceNotFound(_)
            | DomainError::PatientNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::DeviceAlreadyRegistered(_) | DomainError::DeviceAlreadyAssigned(_) => {
                StatusCode::CONFLICT
            }
            DomainError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            DomainError::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiError {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}
