//! JWT Token Handling
//!
//! Creates and validates the signed session tokens. Validity is determined
//! solely by signature and expiry; no revocation list is consulted.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

/// Role claim value carried by admin tokens.
pub const ROLE_ADMIN: &str = "admin";

/// Identity claims embedded in a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user or admin id)
    pub sub: i64,
    /// Username at issue time
    pub username: String,
    /// Email at issue time
    pub email: String,
    /// Role claim; present only on admin tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Issued-at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ROLE_ADMIN)
    }
}

/// Create a signed token for the given identity.
pub fn issue_token(
    user_id: i64,
    username: &str,
    email: &str,
    role: Option<&str>,
    secret: &str,
    ttl: std::time::Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let ttl = Duration::from_std(ttl)
        .map_err(|e| AppError::internal(format!("Invalid token TTL: {}", e)))?;

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        email: email.to_string(),
        role: role.map(String::from),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("Token creation failed: {}", e)))
}

/// Validate and decode a token.
///
/// Malformed, tampered, and expired tokens are all the same failure to the
/// caller; the distinction only goes to the debug log.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0; // No clock skew tolerance

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!(reason = %e, "Token verification failed");
        AppError::auth_failed("Invalid token")
    })
}
