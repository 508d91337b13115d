/// Session token handling
///
/// Session tokens are JWTs. The in-memory backend signs its own tokens with
/// HS256; tokens issued by the hosted service can only be inspected (their
/// signing key never reaches the device), which is enough to learn the
/// account ID and the expiry of a restored session.
///
/// # Claims
///
/// - `sub`: Account ID
/// - `email`: Account email
/// - `role`: Always "authenticated" for signed-in users
/// - `iss`: Issuer
/// - `iat` / `exp`: Issued-at and expiry (Unix seconds)
/// - `jti`: Token ID, unique per issued token

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::dangerous::insecure_decode;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of a freshly issued session token
pub const SESSION_LIFETIME_SECS: i64 = 3600;

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid token format
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - account ID
    pub sub: Uuid,

    /// Account email
    #[serde(default)]
    pub email: String,

    /// Database role the token grants
    #[serde(default = "default_role")]
    pub role: String,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Token ID
    #[serde(default = "Uuid::new_v4")]
    pub jti: Uuid,
}

fn default_role() -> String {
    "authenticated".to_string()
}

impl SessionClaims {
    /// Creates claims with the default session lifetime
    pub fn new(user_id: Uuid, email: &str, issuer: &str) -> Self {
        Self::with_expiration(user_id, email, issuer, Duration::seconds(SESSION_LIFETIME_SECS))
    }

    /// Creates claims with a custom lifetime
    pub fn with_expiration(user_id: Uuid, email: &str, issuer: &str, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.to_string(),
            role: default_role(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            jti: Uuid::new_v4(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Signs claims into an HS256 token
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiry and issuer of an HS256 token
pub fn validate_token(token: &str, secret: &str, issuer: &str) -> Result<SessionClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_exp = true;
    validation.validate_aud = false;
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Reads the claims of a token without checking its signature or expiry
///
/// Only for tokens issued by the hosted service, whose key the client does
/// not hold. Never use the result to grant access.
pub fn inspect_token(token: &str) -> Result<SessionClaims, JwtError> {
    let token_data = insecure_decode::<SessionClaims>(token)
        .map_err(|e| JwtError::InvalidFormat(e.to_string()))?;

    Ok(token_data.claims)
}
