//! Checkout and payment confirmation endpoints
//!
//! Neither route requires a session: checkout is keyed by the application,
//! and confirmation is authorized by possession of the processor session id.

pub mod types;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::domain::payments::{CheckoutError, CheckoutService, ReconcileError, ReconcileService};

use types::{CheckoutResponse, CreateCheckoutRequest, PaymentSuccessQuery, PaymentSuccessResponse};

#[derive(Clone)]
pub struct PaymentsApiState {
    pub checkout: Arc<CheckoutService>,
    pub reconcile: Arc<ReconcileService>,
}

/// Build payment routes
pub fn routes(checkout: Arc<CheckoutService>, reconcile: Arc<ReconcileService>) -> Router<()> {
    let state = PaymentsApiState {
        checkout,
        reconcile,
    };

    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/payment-success", get(payment_success))
        .with_state(state)
}

impl From<CheckoutError> for ApiError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::InvalidAmount
            | CheckoutError::InvalidQuantity
            | CheckoutError::MissingTitle => Self::bad_request("INVALID_CHECKOUT", e.to_string()),
            CheckoutError::UnknownApplication => {
                Self::bad_request("UNKNOWN_APPLICATION", e.to_string())
            }
            CheckoutError::AlreadyPaid => Self::conflict("ALREADY_PAID", e.to_string()),
            CheckoutError::Store(err) => Self::from_data(err),
            other @ (CheckoutError::Processor(_) | CheckoutError::MissingRedirect) => {
                tracing::error!(error = %other, "Checkout failed");
                Self::internal("Server error")
            }
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        let code = match &e {
            ReconcileError::InvalidSessionId => "INVALID_SESSION_ID",
            ReconcileError::SessionNotFound => "SESSION_NOT_FOUND",
            ReconcileError::NotPaid => "PAYMENT_NOT_COMPLETED",
            ReconcileError::MissingLinkage => "MISSING_LINKAGE",
            ReconcileError::LinkageNotFound => "LINKAGE_NOT_FOUND",
            ReconcileError::Processor(_) | ReconcileError::Store(_) => {
                tracing::error!(error = %e, "Payment confirmation failed");
                return Self::internal("Server error");
            }
        };
        Self::bad_request(code, e.to_string())
    }
}

/// Start a hosted checkout for an application fee
#[utoipa::path(
    post,
    path = "/create-checkout-session",
    tag = "payments",
    request_body = CreateCheckoutRequest,
    responses(
        (status = 200, description = "Checkout created", body = CheckoutResponse),
        (status = 400, description = "Invalid pricing or unknown application"),
        (status = 409, description = "Fee already paid")
    )
)]
pub async fn create_checkout_session(
    State(state): State<PaymentsApiState>,
    ValidatedJson(body): ValidatedJson<CreateCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let url = state.checkout.create(&body.into()).await?;
    Ok(Json(CheckoutResponse { url }))
}

/// Confirm a completed checkout and record the fee payment
#[utoipa::path(
    get,
    path = "/payment-success",
    tag = "payments",
    params(("session_id" = String, Query, description = "Processor checkout session id")),
    responses(
        (status = 200, description = "Payment recorded (or already recorded)", body = PaymentSuccessResponse),
        (status = 400, description = "Malformed id, unpaid session or missing linkage")
    )
)]
pub async fn payment_success(
    State(state): State<PaymentsApiState>,
    Query(query): Query<PaymentSuccessQuery>,
) -> Result<Json<PaymentSuccessResponse>, ApiError> {
    let reconciled = state.reconcile.confirm(query.session_id.trim()).await?;
    Ok(Json(reconciled.into()))
}
