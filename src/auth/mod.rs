/*!
 * # Authentication Module
 *
 * Bearer-token authentication for the Atelier API. A caller presents an
 * HS256-signed JWT; the extractor turns it into an [`AuthUser`] carrying the
 * account id, which every owner-gated service operation takes as its caller
 * context. Ownership itself is checked in the service layer against the
 * records being touched - this module only answers "who is calling".
 */

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ServiceError, AppState};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (account ID)
    pub iat: i64,    // Issued at time
    pub exp: i64,    // Expiration time
}

/// Authenticated caller context extracted from the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub account_id: Uuid,
}

/// Issues an access token for the given account
pub fn issue_access_token(
    account_id: Uuid,
    secret: &str,
    expires_in_secs: i64,
) -> Result<String, ServiceError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::AuthError(format!("Failed to issue token: {}", e)))
}

/// Validates an access token and returns the caller context.
///
/// Every failure collapses to the same message so callers cannot distinguish
/// a malformed token from an expired one.
pub fn decode_access_token(token: &str, secret: &str) -> Result<AuthUser, ServiceError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| ServiceError::AuthError("Invalid or expired token".to_string()))?;

    let account_id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ServiceError::AuthError("Invalid or expired token".to_string()))?;

    Ok(AuthUser { account_id })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServiceError::AuthError("Missing authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::AuthError("Malformed authorization header".to_string()))?;

        decode_access_token(token, &state.config.jwt_secret)
    }
}
