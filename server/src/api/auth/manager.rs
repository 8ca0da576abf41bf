//! Authentication manager
//!
//! Production `IdentityIssuer`: verifies provider ID tokens and mints HS256
//! session artifacts. Also owns the session cookie policy.

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::credential::VerifiedSubject;
use super::id_token::IdTokenVerifier;
use super::issuer::{IdAssertion, IdentityIssuer, IssuerError};
use super::jwt::{JwtError, SessionClaims, create_session_token, validate_session_token};
use crate::core::config::{AuthConfig, Environment};
use crate::core::constants::{MAX_ASSERTION_AGE_SECS, SESSION_COOKIE_NAME, SESSION_TTL_DAYS};

pub struct AuthManager {
    signing_key: Vec<u8>,
    id_tokens: IdTokenVerifier,
    sessions_valid_after: Option<i64>,
}

impl AuthManager {
    pub fn init(config: &AuthConfig) -> Result<Self, IssuerError> {
        let id_tokens = IdTokenVerifier::new(&config.firebase_project_id, &config.jwks_url)?;
        if config.session_secret_ephemeral {
            tracing::warn!("Using an ephemeral session secret; sessions end on restart");
        }
        tracing::debug!(project = %config.firebase_project_id, "Authentication initialized");
        Ok(Self::new(
            config.session_secret.as_bytes().to_vec(),
            id_tokens,
            config.sessions_valid_after,
        ))
    }

    pub fn new(
        signing_key: Vec<u8>,
        id_tokens: IdTokenVerifier,
        sessions_valid_after: Option<i64>,
    ) -> Self {
        Self {
            signing_key,
            id_tokens,
            sessions_valid_after,
        }
    }
}

#[async_trait]
impl IdentityIssuer for AuthManager {
    async fn verify_id_token(&self, token: &str) -> Result<IdAssertion, IssuerError> {
        self.id_tokens.verify(token).await
    }

    fn verify_session(&self, token: &str) -> Result<VerifiedSubject, IssuerError> {
        validate_session_token(token, &self.signing_key, self.sessions_valid_after)
            .map(|claims| claims.subject())
            .map_err(|e| match e {
                JwtError::Expired => IssuerError::Expired,
                JwtError::Revoked => IssuerError::Revoked,
                other => IssuerError::InvalidToken(other.to_string()),
            })
    }

    fn mint_session(&self, assertion: &IdAssertion) -> Result<String, IssuerError> {
        let claims = SessionClaims::new(&assertion.subject, assertion.auth_time);
        create_session_token(&self.signing_key, &claims)
            .map_err(|e| IssuerError::Signing(e.to_string()))
    }
}

/// Verify an ID token, require a recent sign-in, and mint a session
///
/// Returns the assertion alongside the artifact so the caller can register
/// the identity before handing out the cookie.
pub async fn exchange_assertion(
    issuer: &dyn IdentityIssuer,
    id_token: &str,
) -> Result<(IdAssertion, String), IssuerError> {
    let assertion = issuer.verify_id_token(id_token).await?;

    let age = chrono::Utc::now().timestamp() - assertion.auth_time;
    if age > MAX_ASSERTION_AGE_SECS {
        tracing::debug!(age_secs = age, "Rejected stale sign-in");
        return Err(IssuerError::StaleAssertion);
    }

    let session = issuer.mint_session(&assertion)?;
    Ok((assertion, session))
}

fn base_cookie(value: String, environment: Environment) -> Cookie<'static> {
    let (secure, same_site) = if environment.is_production() {
        (true, SameSite::None)
    } else {
        (false, SameSite::Lax)
    };
    Cookie::build((SESSION_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .build()
}

/// Session cookie carrying a freshly minted artifact
pub fn session_cookie(token: String, environment: Environment) -> Cookie<'static> {
    let mut cookie = base_cookie(token, environment);
    cookie.set_max_age(time::Duration::days(SESSION_TTL_DAYS));
    cookie
}

/// Expired cookie with the same name, path and attributes
///
/// Added to the jar unconditionally so the response always clears the cookie.
pub fn removal_cookie(environment: Environment) -> Cookie<'static> {
    let mut cookie = base_cookie(String::new(), environment);
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::credential::Credential;
    use crate::api::auth::id_token::test_keys::{self, PROJECT_ID};

    fn manager() -> AuthManager {
        AuthManager::new(
            vec![7u8; 32],
            IdTokenVerifier::with_keys(PROJECT_ID, test_keys::jwks()),
            None,
        )
    }

    #[tokio::test]
    async fn test_exchange_then_verify_session() {
        let manager = manager();
        let token = test_keys::id_token("ana@example.com");
        let (assertion, session) = exchange_assertion(&manager, &token).await.unwrap();
        assert_eq!(assertion.subject.email, "ana@example.com");

        let subject = manager.verify_session(&session).unwrap();
        assert_eq!(subject, assertion.subject);
    }

    #[tokio::test]
    async fn test_stale_sign_in_is_rejected() {
        let token = test_keys::sign(
            &test_keys::claims_for("ana@example.com", MAX_ASSERTION_AGE_SECS + 60),
            test_keys::KID,
        );
        assert!(matches!(
            exchange_assertion(&manager(), &token).await,
            Err(IssuerError::StaleAssertion)
        ));
    }

    #[tokio::test]
    async fn test_credential_sources() {
        let manager = manager();
        let id_token = test_keys::id_token("ana@example.com");
        let (_, session) = exchange_assertion(&manager, &id_token).await.unwrap();

        let from_cookie = manager
            .verify_credential(&Credential::SessionCookie(session))
            .await
            .unwrap();
        let from_bearer = manager
            .verify_credential(&Credential::BearerToken(id_token))
            .await
            .unwrap();
        assert_eq!(from_cookie, from_bearer);

        // A bearer ID token is not a session artifact and vice versa
        assert!(
            manager
                .verify_credential(&Credential::SessionCookie("garbage".to_string()))
                .await
                .is_err()
        );
    }

    #[test]
    fn test_revoked_sessions() {
        let subject = VerifiedSubject::new("uid-1", "ana@example.com");
        let claims = SessionClaims::new(&subject, 0);
        let key = vec![7u8; 32];
        let token = create_session_token(&key, &claims).unwrap();

        let manager = AuthManager::new(
            key,
            IdTokenVerifier::with_keys(PROJECT_ID, test_keys::jwks()),
            Some(claims.iat + 10),
        );
        assert!(matches!(
            manager.verify_session(&token),
            Err(IssuerError::Revoked)
        ));
    }

    #[test]
    fn test_cookie_attributes_per_environment() {
        let prod = session_cookie("t".to_string(), Environment::Production);
        assert_eq!(prod.name(), SESSION_COOKIE_NAME);
        assert_eq!(prod.secure(), Some(true));
        assert_eq!(prod.same_site(), Some(SameSite::None));
        assert_eq!(prod.http_only(), Some(true));
        assert_eq!(prod.path(), Some("/"));
        assert_eq!(prod.max_age(), Some(time::Duration::days(7)));

        let dev = session_cookie("t".to_string(), Environment::Development);
        assert_eq!(dev.secure(), Some(false));
        assert_eq!(dev.same_site(), Some(SameSite::Lax));

        let removal = removal_cookie(Environment::Production);
        assert_eq!(removal.path(), Some("/"));
        assert_eq!(removal.same_site(), Some(SameSite::None));
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(time::Duration::ZERO));
    }
}
