//! Loan API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};

use crate::api::auth::{AdminOrManager, ManagerOnly, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::types::{ApiError, SuccessResponse};
use crate::data::TransactionalRepository;
use crate::data::types::LoanUpdate;

use types::{CreateLoanRequest, LoanDto, UpdateLoanRequest};

#[derive(Clone)]
pub struct LoansApiState {
    pub store: Arc<dyn TransactionalRepository>,
}

/// Build loan routes
pub fn routes(store: Arc<dyn TransactionalRepository>) -> Router<()> {
    let state = LoansApiState { store };

    Router::new()
        .route("/loans", post(create_loan))
        .route("/loans/{id}", patch(update_loan).delete(delete_loan))
        .with_state(state)
}

fn loan_not_found() -> ApiError {
    ApiError::not_found("LOAN_NOT_FOUND", "Loan not found")
}

/// Create a loan product
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanDto),
        (status = 403, description = "Manager only")
    )
)]
pub async fn create_loan(
    State(state): State<LoansApiState>,
    auth: RequireRole<ManagerOnly>,
    ValidatedJson(body): ValidatedJson<CreateLoanRequest>,
) -> Result<(StatusCode, Json<LoanDto>), ApiError> {
    let loan = state
        .store
        .create_loan(&body.into_new_loan(auth.email()))
        .await?;

    tracing::info!(loan_id = %loan.id, created_by = %loan.created_by, "Loan created");
    Ok((StatusCode::CREATED, Json(LoanDto::from(loan))))
}

/// Update a loan product
#[utoipa::path(
    patch,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = String, Path, description = "Loan id")),
    request_body = UpdateLoanRequest,
    responses(
        (status = 200, description = "Loan updated", body = LoanDto),
        (status = 400, description = "Nothing to update"),
        (status = 403, description = "Admin or manager only"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn update_loan(
    State(state): State<LoansApiState>,
    _auth: RequireRole<AdminOrManager>,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<UpdateLoanRequest>,
) -> Result<Json<LoanDto>, ApiError> {
    let update: LoanUpdate = body.into();
    if update.is_empty() {
        return Err(ApiError::bad_request("EMPTY_UPDATE", "No fields to update"));
    }
    let loan = state
        .store
        .update_loan(&id, &update)
        .await?
        .ok_or_else(loan_not_found)?;
    Ok(Json(LoanDto::from(loan)))
}

/// Delete a loan product
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = String, Path, description = "Loan id")),
    responses(
        (status = 200, description = "Loan deleted", body = SuccessResponse),
        (status = 403, description = "Admin or manager only"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<LoansApiState>,
    auth: RequireRole<AdminOrManager>,
    IdPath(id): IdPath,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !state.store.delete_loan(&id).await? {
        return Err(loan_not_found());
    }
    tracing::info!(loan_id = %id, by = %auth.email(), "Loan deleted");
    Ok(Json(SuccessResponse::ok()))
}
