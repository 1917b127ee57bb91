use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Reading rate limit exceeded for device: {0}")]
    RateLimited(String),

    #[error("Device not registered: {0}")]
    DeviceNotRegistered(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device already registered: {0}")]
    DeviceAlreadyRegistered(String),

    #[error("Device already assigned to a patient: {0}")]
    DeviceAlreadyAssigned(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Invalid sampling interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
