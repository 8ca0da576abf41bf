//! User API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::auth::{AdminOnly, Auth, RequireRole};
use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::data::TransactionalRepository;
use crate::data::types::{ListIdentitiesParams, Role};

use types::{
    ChangeRoleRequest, ListUsersQuery, RegisterUserRequest, RoleResponse, SuspendRequest,
    UpdateProfileRequest, UserDto,
};

/// Shared state for Users API endpoints
#[derive(Clone)]
pub struct UsersApiState {
    pub store: Arc<dyn TransactionalRepository>,
}

/// Build Users API routes
pub fn routes(store: Arc<dyn TransactionalRepository>) -> Router<()> {
    let state = UsersApiState { store };

    Router::new()
        .route("/user", post(register_user))
        .route("/user/role", get(get_own_role))
        .route("/users", get(list_users).patch(change_role))
        .route("/users/{email}", patch(update_profile))
        .route("/users/suspend/{id}", patch(suspend_user))
        .with_state(state)
}

fn user_not_found() -> ApiError {
    ApiError::not_found("USER_NOT_FOUND", "User not found")
}

/// Register the caller, or refresh their last login
#[utoipa::path(
    post,
    path = "/user",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered identity", body = UserDto),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn register_user(
    State(state): State<UsersApiState>,
    Auth(subject): Auth,
    ValidatedJson(body): ValidatedJson<RegisterUserRequest>,
) -> Result<Json<UserDto>, ApiError> {
    let identity = state
        .store
        .upsert_identity(&subject.email, body.name.as_deref(), body.image.as_deref())
        .await?;
    Ok(Json(UserDto::from(identity)))
}

/// Role and status of the caller
#[utoipa::path(
    get,
    path = "/user/role",
    tag = "users",
    responses(
        (status = 200, description = "Caller role", body = RoleResponse),
        (status = 404, description = "Caller is not registered")
    )
)]
pub async fn get_own_role(
    State(state): State<UsersApiState>,
    Auth(subject): Auth,
) -> Result<Json<RoleResponse>, ApiError> {
    let identity = state
        .store
        .get_identity_by_email(&subject.email)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(RoleResponse {
        role: identity.role,
        status: identity.status,
    }))
}

/// Paged user directory, excluding the caller
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("limit" = Option<u32>, Query, description = "Page size (default 5, max 100)"),
        ("search" = Option<String>, Query, description = "Name or email substring"),
        ("role" = Option<Role>, Query, description = "Role filter")
    ),
    responses(
        (status = 200, description = "Paginated users"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    State(state): State<UsersApiState>,
    auth: RequireRole<AdminOnly>,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserDto>>, ApiError> {
    let params = ListIdentitiesParams {
        exclude_email: auth.email().to_string(),
        search: query.search.clone(),
        role: query.role,
        page: query.page,
        limit: query.limit,
    };
    let (rows, total) = state.store.list_identities(&params).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(UserDto::from).collect(),
        query.page,
        query.limit,
        total,
    )))
}

/// Change another identity's role
#[utoipa::path(
    patch,
    path = "/users",
    tag = "users",
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Updated identity", body = UserDto),
        (status = 400, description = "Admin tried to demote themself"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn change_role(
    State(state): State<UsersApiState>,
    auth: RequireRole<AdminOnly>,
    ValidatedJson(body): ValidatedJson<ChangeRoleRequest>,
) -> Result<Json<UserDto>, ApiError> {
    if auth.subject.is(&body.email) && body.role != Role::Admin {
        return Err(ApiError::bad_request(
            "CANNOT_DEMOTE_SELF",
            "Admins cannot change their own role",
        ));
    }

    let identity = state
        .store
        .set_identity_role(&body.email, body.role)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(
        admin = %auth.email(),
        email = %identity.email,
        role = %identity.role,
        "Role changed"
    );
    Ok(Json(UserDto::from(identity)))
}

/// Update the caller's own profile
#[utoipa::path(
    patch,
    path = "/users/{email}",
    tag = "users",
    params(("email" = String, Path, description = "Caller's email")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated identity", body = UserDto),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_profile(
    State(state): State<UsersApiState>,
    Auth(subject): Auth,
    Path(email): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserDto>, ApiError> {
    if !subject.is(&email) {
        return Err(ApiError::not_self());
    }

    let identity = state
        .store
        .update_identity_profile(&subject.email, body.name.as_deref(), body.image.as_deref())
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(UserDto::from(identity)))
}

/// Suspend an identity
#[utoipa::path(
    patch,
    path = "/users/suspend/{id}",
    tag = "users",
    params(("id" = String, Path, description = "Identity id")),
    request_body = SuspendRequest,
    responses(
        (status = 200, description = "Suspended identity", body = UserDto),
        (status = 400, description = "Admin tried to suspend themself"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn suspend_user(
    State(state): State<UsersApiState>,
    auth: RequireRole<AdminOnly>,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<SuspendRequest>,
) -> Result<Json<UserDto>, ApiError> {
    if auth.identity.id == id {
        return Err(ApiError::bad_request(
            "CANNOT_SUSPEND_SELF",
            "Admins cannot suspend themselves",
        ));
    }

    let identity = state
        .store
        .suspend_identity(&id, body.reason.trim(), body.feedback.trim())
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(admin = %auth.email(), email = %identity.email, "User suspended");
    Ok(Json(UserDto::from(identity)))
}
