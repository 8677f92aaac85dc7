//! JWT issuance and validation. Tokens are the only carrier of tenant
//! identity: handlers resolve the tenant database from the `database` claim
//! and never from request parameters.

pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::registry::AdminEntry;

pub const ROLE_SUPERADMIN: &str = "superadmin";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    pub role: String,
    /// Tenant database for admin tokens. Superadmin tokens carry none.
    pub database: Option<String>,
    pub admin_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn superadmin(username: &str, expiry_hours: u64) -> Self {
        Self::build(username, ROLE_SUPERADMIN, None, None, expiry_hours)
    }

    pub fn admin(entry: &AdminEntry, expiry_hours: u64) -> Self {
        Self::build(
            &entry.username,
            ROLE_ADMIN,
            Some(entry.tenant_db.clone()),
            Some(entry.id),
            expiry_hours,
        )
    }

    fn build(
        username: &str,
        role: &str,
        database: Option<String>,
        admin_id: Option<Uuid>,
        expiry_hours: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: username.to_string(),
            role: role.to_string(),
            database,
            admin_id,
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid or expired token")]
    TokenInvalid,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| JwtError::TokenInvalid)
}
