//! Token issuance and password hashing.
//!
//! Accounts authenticate with a short-lived access JWT plus a longer-lived
//! refresh JWT. Both carry the user id in `sub` and a `token_type` marker so
//! a refresh token can never be presented as an access token.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::AppError;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Issues an access/refresh pair for a user.
pub fn issue_token_pair(user_id: i64, config: &JwtConfig) -> Result<TokenPair, AppError> {
    let access = issue_token(
        user_id,
        TOKEN_TYPE_ACCESS,
        Duration::minutes(config.access_expires_minutes),
        config,
    )?;
    let refresh = issue_token(
        user_id,
        TOKEN_TYPE_REFRESH,
        Duration::days(config.refresh_expires_days),
        config,
    )?;
    Ok(TokenPair { access, refresh })
}

fn issue_token(
    user_id: i64,
    token_type: &str,
    lifetime: Duration,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        token_type: token_type.to_string(),
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
}

/// Decodes and verifies a token, additionally checking its `token_type`.
/// Expired or tampered tokens come back as `Unauthorized`.
pub fn decode_token(token: &str, expected_type: &str, config: &JwtConfig) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    if data.claims.token_type != expected_type {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }
    Ok(data.claims)
}

/// Exchanges a valid refresh token for a fresh access token.
pub fn refresh_access_token(refresh_token: &str, config: &JwtConfig) -> Result<String, AppError> {
    let claims = decode_token(refresh_token, TOKEN_TYPE_REFRESH, config)?;
    issue_token(
        claims.sub,
        TOKEN_TYPE_ACCESS,
        Duration::minutes(config.access_expires_minutes),
        config,
    )
}
