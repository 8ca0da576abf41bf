//! JWT session token handling

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credential::VerifiedSubject;
use crate::core::constants::SESSION_TTL_DAYS;

/// JWT validation error
#[derive(Debug)]
pub enum JwtError {
    /// Token signature has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Issued before the revocation cutoff
    Revoked,
    /// Token could not be signed
    Signing(String),
    /// Other validation error
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Session token has expired"),
            Self::InvalidSignature => write!(f, "Invalid session token signature"),
            Self::Revoked => write!(f, "Session token has been revoked"),
            Self::Signing(msg) => write!(f, "Failed to sign session token: {}", msg),
            Self::Invalid(msg) => write!(f, "Invalid session token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject email
    pub sub: String,
    /// Identity provider user id
    pub uid: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// When the user signed in with the identity provider
    pub auth_time: i64,
}

impl SessionClaims {
    pub fn new(subject: &VerifiedSubject, auth_time: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::days(SESSION_TTL_DAYS);

        Self {
            sub: subject.email.clone(),
            uid: subject.uid.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            auth_time,
        }
    }

    pub fn subject(&self) -> VerifiedSubject {
        VerifiedSubject::new(self.uid.clone(), &self.sub)
    }
}

/// Create a signed JWT session token
pub fn create_session_token(
    signing_key: &[u8],
    claims: &SessionClaims,
) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| JwtError::Signing(e.to_string()))
}

/// Validate and decode a JWT session token
///
/// Tokens issued before `valid_after` (unix seconds) are rejected as revoked.
pub fn validate_session_token(
    token: &str,
    signing_key: &[u8],
    valid_after: Option<i64>,
) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "iat", "sub"]);

    let token_data =
        decode::<SessionClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::Invalid(e.to_string()),
            })?;

    let claims = token_data.claims;
    if claims.sub.trim().is_empty() {
        return Err(JwtError::Invalid("empty subject".to_string()));
    }
    if let Some(cutoff) = valid_after
        && claims.iat < cutoff
    {
        return Err(JwtError::Revoked);
    }

    Ok(claims)
}
