//! Loan application endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};

use crate::api::auth::{BorrowerOnly, ManagerOnly, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::types::{ApiError, SuccessResponse};
use crate::data::TransactionalRepository;
use crate::data::types::{ApplicationRow, ApplicationStatus, CancelOutcome, NewApplication};

use types::{ApplicationDto, CreateApplicationRequest, UpdateStatusRequest};

#[derive(Clone)]
pub struct ApplicationsApiState {
    pub store: Arc<dyn TransactionalRepository>,
}

/// Build loan application routes
pub fn routes(store: Arc<dyn TransactionalRepository>) -> Router<()> {
    let state = ApplicationsApiState { store };

    Router::new()
        .route("/loans/application", post(create_application))
        .route("/pending-loans", get(list_pending))
        .route("/approved-loans", get(list_approved))
        .route("/update-status/{id}", patch(update_status))
        .route("/my-loans/{email}", get(list_own))
        .route("/loan-application/{id}", delete(cancel_application))
        .with_state(state)
}

fn application_not_found() -> ApiError {
    ApiError::not_found("APPLICATION_NOT_FOUND", "Loan application not found")
}

fn to_dtos(rows: Vec<ApplicationRow>) -> Json<Vec<ApplicationDto>> {
    Json(rows.into_iter().map(ApplicationDto::from).collect())
}

/// Apply for a loan
#[utoipa::path(
    post,
    path = "/loans/application",
    tag = "applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application created as Pending/Unpaid", body = ApplicationDto),
        (status = 400, description = "Unknown loan or amount above the loan limit"),
        (status = 403, description = "Borrower only")
    )
)]
pub async fn create_application(
    State(state): State<ApplicationsApiState>,
    auth: RequireRole<BorrowerOnly>,
    ValidatedJson(body): ValidatedJson<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationDto>), ApiError> {
    let loan = state
        .store
        .get_loan(&body.loan_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("UNKNOWN_LOAN", "Loan does not exist"))?;

    if body.loan_amount > loan.max_loan_limit {
        return Err(ApiError::bad_request(
            "AMOUNT_OVER_LIMIT",
            format!("Loan amount exceeds the limit of {}", loan.max_loan_limit),
        ));
    }

    let details = serde_json::to_value(&body.details)
        .map_err(|e| ApiError::internal(format!("Failed to encode details: {e}")))?;

    let application = state
        .store
        .create_application(&NewApplication {
            loan_id: loan.id,
            loan_title: loan.title,
            user_email: auth.email().to_string(),
            loan_amount: body.loan_amount,
            details,
        })
        .await?;

    tracing::info!(
        application_id = %application.id,
        email = %application.user_email,
        "Loan application submitted"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApplicationDto::from(application)),
    ))
}

/// Pending applications, newest first
#[utoipa::path(
    get,
    path = "/pending-loans",
    tag = "applications",
    responses(
        (status = 200, description = "Pending applications", body = Vec<ApplicationDto>),
        (status = 403, description = "Manager only")
    )
)]
pub async fn list_pending(
    State(state): State<ApplicationsApiState>,
    _auth: RequireRole<ManagerOnly>,
) -> Result<Json<Vec<ApplicationDto>>, ApiError> {
    let rows = state
        .store
        .list_applications_by_status(ApplicationStatus::Pending)
        .await?;
    Ok(to_dtos(rows))
}

/// Approved applications, most recently approved first
#[utoipa::path(
    get,
    path = "/approved-loans",
    tag = "applications",
    responses(
        (status = 200, description = "Approved applications", body = Vec<ApplicationDto>),
        (status = 403, description = "Manager only")
    )
)]
pub async fn list_approved(
    State(state): State<ApplicationsApiState>,
    _auth: RequireRole<ManagerOnly>,
) -> Result<Json<Vec<ApplicationDto>>, ApiError> {
    let rows = state
        .store
        .list_applications_by_status(ApplicationStatus::Approved)
        .await?;
    Ok(to_dtos(rows))
}

/// Approve or reject an application
#[utoipa::path(
    patch,
    path = "/update-status/{id}",
    tag = "applications",
    params(("id" = String, Path, description = "Application id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated application", body = ApplicationDto),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn update_status(
    State(state): State<ApplicationsApiState>,
    auth: RequireRole<ManagerOnly>,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<ApplicationDto>, ApiError> {
    let application = state
        .store
        .update_application_status(&id, body.status)
        .await?
        .ok_or_else(application_not_found)?;

    tracing::info!(
        application_id = %application.id,
        status = %application.status,
        manager = %auth.email(),
        "Application status updated"
    );
    Ok(Json(ApplicationDto::from(application)))
}

/// The caller's own applications
#[utoipa::path(
    get,
    path = "/my-loans/{email}",
    tag = "applications",
    params(("email" = String, Path, description = "Caller's email")),
    responses(
        (status = 200, description = "Caller's applications", body = Vec<ApplicationDto>),
        (status = 403, description = "Borrower only, own email only")
    )
)]
pub async fn list_own(
    State(state): State<ApplicationsApiState>,
    auth: RequireRole<BorrowerOnly>,
    Path(email): Path<String>,
) -> Result<Json<Vec<ApplicationDto>>, ApiError> {
    if !auth.subject.is(&email) {
        return Err(ApiError::not_self());
    }
    let rows = state.store.list_applications_for_user(auth.email()).await?;
    Ok(to_dtos(rows))
}

/// Withdraw an application that is still Pending and Unpaid
#[utoipa::path(
    delete,
    path = "/loan-application/{id}",
    tag = "applications",
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application withdrawn", body = SuccessResponse),
        (status = 403, description = "Borrower only"),
        (status = 404, description = "No such application for the caller"),
        (status = 409, description = "Application already decided or paid")
    )
)]
pub async fn cancel_application(
    State(state): State<ApplicationsApiState>,
    auth: RequireRole<BorrowerOnly>,
    IdPath(id): IdPath,
) -> Result<Json<SuccessResponse>, ApiError> {
    match state.store.cancel_application(&id, auth.email()).await? {
        CancelOutcome::Deleted => {
            tracing::info!(application_id = %id, email = %auth.email(), "Application withdrawn");
            Ok(Json(SuccessResponse::ok()))
        }
        CancelOutcome::NotFound => Err(application_not_found()),
        CancelOutcome::Locked => Err(ApiError::conflict(
            "APPLICATION_LOCKED",
            "Only pending, unpaid applications can be withdrawn",
        )),
    }
}
