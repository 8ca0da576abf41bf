//! Authentication API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::auth::{
    AuthError, IdentityIssuer, exchange_assertion, removal_cookie, session_cookie,
};
use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, SuccessResponse};
use crate::core::config::Environment;
use crate::data::TransactionalRepository;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Identity provider ID token from a fresh sign-in
    #[validate(length(min = 1, message = "Token cannot be empty"))]
    pub id_token: String,
}

#[derive(Clone)]
pub struct AuthRoutesState {
    pub issuer: Arc<dyn IdentityIssuer>,
    pub store: Arc<dyn TransactionalRepository>,
    pub environment: Environment,
}

/// Create auth routes
pub fn routes(
    issuer: Arc<dyn IdentityIssuer>,
    store: Arc<dyn TransactionalRepository>,
    environment: Environment,
) -> Router {
    let state = AuthRoutesState {
        issuer,
        store,
        environment,
    };

    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Exchange an ID token for a session cookie
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookie set", body = SuccessResponse),
        (status = 400, description = "Missing token"),
        (status = 401, description = "Invalid, expired or stale token")
    )
)]
pub async fn login(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<SuccessResponse>), Response> {
    let (assertion, session) = exchange_assertion(state.issuer.as_ref(), &request.id_token)
        .await
        .map_err(|e| {
            if e.is_internal() {
                tracing::error!(error = %e, "Login failed");
                AuthError::server_error().into_response()
            } else {
                tracing::debug!(error = %e, "Login rejected");
                AuthError::invalid_token().into_response()
            }
        })?;

    // Register before handing out the cookie; a store failure leaves the client logged out
    state
        .store
        .upsert_identity(
            &assertion.subject.email,
            assertion.name.as_deref(),
            assertion.picture.as_deref(),
        )
        .await
        .map_err(|e| ApiError::from_data(e).into_response())?;

    tracing::info!(email = %assertion.subject.email, "User logged in");
    Ok((
        jar.add(session_cookie(session, state.environment)),
        Json(SuccessResponse::ok()),
    ))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = SuccessResponse)
    )
)]
pub async fn logout(
    State(state): State<AuthRoutesState>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    (
        jar.add(removal_cookie(state.environment)),
        Json(SuccessResponse::ok()),
    )
}
