use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use thermoband_domain::{DomainError, DomainResult};

use crate::error::ApiError;

/// JWT signing settings for clinical-user tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
}

impl JwtConfig {
    pub fn new(secret: String, expiration_hours: u64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub exp: usize,  // expiration timestamp
    pub iat: usize,  // issued at timestamp
}

/// Trait for authentication token operations (JWT access tokens)
pub trait AuthTokenProvider: Send + Sync {
    /// Generate an access token (JWT) for a user
    fn generate_token(&self, user_id: &str) -> DomainResult<String>;

    /// Validate an access token and extract the user ID
    fn validate_token(&self, token: &str) -> DomainResult<String>;
}

/// JWT-based implementation of AuthTokenProvider
pub struct JwtAuthTokenProvider {
    config: JwtConfig,
}

impl JwtAuthTokenProvider {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }
}

impl AuthTokenProvider for JwtAuthTokenProvider {
    fn generate_token(&self, user_id: &str) -> DomainResult<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.config.expiration_hours as i64);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!("JWT encoding error: {}", e)))
    }

    fn validate_token(&self, token: &str) -> DomainResult<String> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| DomainError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims.sub)
    }
}

/// Resolve the calling clinical user from a bearer Authorization header.
pub fn extract_user_id(
    headers: &HeaderMap,
    provider: &dyn AuthTokenProvider,
) -> Result<String, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Expected bearer token"))?;

    provider.validate_token(token).map_err(ApiError::from)
}

/// Check the shared device API key on device-facing routes. A missing
/// configured key disables the check (local development).
pub fn verify_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match headers.get("x-api-key").and_then(|value| value.to_str().ok()) {
        Some(provided) if provided == expected => Ok(()),
        _ => Err(ApiError::unauthorized("Invalid API key")),
    }
}
