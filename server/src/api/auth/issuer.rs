//! Identity issuer interface
//!
//! The issuer is the only component that understands token formats. Everything
//! downstream sees a `VerifiedSubject` or an `IssuerError`.

use async_trait::async_trait;
use thiserror::Error;

use super::credential::{Credential, VerifiedSubject};

#[derive(Error, Debug)]
pub enum IssuerError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token has expired")]
    Expired,
    #[error("Token has been revoked")]
    Revoked,
    #[error("Unknown signing key: {0}")]
    UnknownKey(String),
    #[error("Sign-in is too old for a new session")]
    StaleAssertion,
    #[error("Signing key source unavailable: {0}")]
    KeySource(String),
    #[error("Failed to mint session: {0}")]
    Signing(String),
}

impl IssuerError {
    /// Failures of the issuer itself rather than of the presented credential
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::KeySource(_) | Self::Signing(_))
    }
}

/// A verified identity provider assertion
#[derive(Debug, Clone)]
pub struct IdAssertion {
    pub subject: VerifiedSubject,
    pub name: Option<String>,
    pub picture: Option<String>,
    /// Unix seconds of the provider sign-in
    pub auth_time: i64,
}

#[async_trait]
pub trait IdentityIssuer: Send + Sync {
    /// Verify an identity provider ID token
    async fn verify_id_token(&self, token: &str) -> Result<IdAssertion, IssuerError>;

    /// Verify a session artifact, including the revocation check
    fn verify_session(&self, token: &str) -> Result<VerifiedSubject, IssuerError>;

    /// Mint a session artifact for a verified assertion
    fn mint_session(&self, assertion: &IdAssertion) -> Result<String, IssuerError>;

    /// Resolve a request credential to its subject
    async fn verify_credential(
        &self,
        credential: &Credential,
    ) -> Result<VerifiedSubject, IssuerError> {
        match credential {
            Credential::SessionCookie(token) => self.verify_session(token),
            Credential::BearerToken(token) => self.verify_id_token(token).await.map(|a| a.subject),
        }
    }
}
