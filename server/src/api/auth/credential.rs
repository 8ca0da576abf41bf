//! Request credentials and the verified subject they resolve to

use axum::http::{HeaderMap, header};
use axum_extra::extract::CookieJar;

use crate::core::constants::SESSION_COOKIE_NAME;

/// The one credential trusted for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Session artifact from the `rin_session` cookie
    SessionCookie(String),
    /// Identity provider ID token from `Authorization: Bearer`
    BearerToken(String),
}

impl Credential {
    /// Pick the request's credential. The cookie wins when both are present.
    ///
    /// Empty values are returned as-is so verification fails them uniformly.
    pub fn from_request(jar: &CookieJar, headers: &HeaderMap) -> Option<Self> {
        if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
            return Some(Self::SessionCookie(cookie.value().to_string()));
        }

        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Some(Self::BearerToken(token.trim().to_string()))
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::SessionCookie(_) => "cookie",
            Self::BearerToken(_) => "bearer",
        }
    }
}

/// Identity established by the credential verifier
///
/// Carries no role: roles are always read from the store by the role guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubject {
    /// Identity provider user id
    pub uid: String,
    /// Lowercased email, the key of the identity record
    pub email: String,
}

impl VerifiedSubject {
    pub fn new(uid: impl Into<String>, email: &str) -> Self {
        Self {
            uid: uid.into(),
            email: email.trim().to_lowercase(),
        }
    }

    /// Case-insensitive comparison against a path or body email
    pub fn is(&self, email: &str) -> bool {
        self.email == email.trim().to_lowercase()
    }
}
