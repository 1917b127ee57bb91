pub mod auth;
pub mod binding_handler;
pub mod dto;
pub mod error;
pub mod patient_handler;
pub mod server;
pub mod telemetry_handler;

pub use auth::{AuthTokenProvider, JwtAuthTokenProvider, JwtConfig};
pub use error::ApiError;
pub use server::{create_router, serve, AppState};
