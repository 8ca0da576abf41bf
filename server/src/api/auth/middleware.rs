//! Authentication middleware

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::credential::Credential;
use super::issuer::IdentityIssuer;
use crate::core::constants::UNAUTHORIZED_MESSAGE;

/// Authentication error response
///
/// Every credential failure renders the same body; the cause is only logged.
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl AuthError {
    pub fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "UNAUTHENTICATED",
            message: UNAUTHORIZED_MESSAGE.to_string(),
        }
    }

    /// Login with an assertion that failed verification or is too old
    pub fn invalid_token() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "INVALID_TOKEN",
            message: "Invalid token".to_string(),
        }
    }

    /// The issuer itself failed (key endpoint down, signing failure)
    pub fn server_error() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "internal_error",
            code: "INTERNAL",
            message: "Server error".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error,
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub issuer: Arc<dyn IdentityIssuer>,
}

/// Authentication middleware
///
/// Resolves the request credential (session cookie first, then bearer token)
/// and injects the `VerifiedSubject` into request extensions. Never touches
/// the store.
pub async fn require_auth(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let credential = Credential::from_request(&jar, request.headers()).ok_or_else(|| {
        tracing::debug!("Rejected request without credentials");
        AuthError::unauthenticated()
    })?;

    let subject = state
        .issuer
        .verify_credential(&credential)
        .await
        .map_err(|e| {
            if e.is_internal() {
                tracing::error!(error = %e, source = credential.source(), "Credential verification failed");
                AuthError::server_error()
            } else {
                tracing::debug!(error = %e, source = credential.source(), "Rejected credential");
                AuthError::unauthenticated()
            }
        })?;

    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}
