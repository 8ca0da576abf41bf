//! User API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::types::{default_limit, default_page, validate_limit, validate_page};
use crate::data::types::{IdentityRow, IdentityStatus, Role};

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

/// User DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub status: IdentityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_logged_in: DateTime<Utc>,
}

impl From<IdentityRow> for UserDto {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            image: row.image,
            role: row.role,
            status: row.status,
            suspend_reason: row.suspend_reason,
            suspend_feedback: row.suspend_feedback,
            created_at: timestamp(row.created_at),
            last_logged_in: timestamp(row.last_logged_in),
        }
    }
}

/// Response for GET /user/role
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub role: Role,
    pub status: IdentityStatus,
}

/// Profile fields offered on registration; email and role are never taken from the body
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RegisterUserRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
    #[validate(url(message = "Image must be a URL"))]
    pub image: Option<String>,
}

/// Query for GET /users
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    #[validate(custom(function = "validate_page"))]
    pub page: u32,
    #[serde(default = "default_limit")]
    #[validate(custom(function = "validate_limit"))]
    pub limit: u32,
    /// Substring of name or email
    #[validate(length(max = 100, message = "Search must be at most 100 characters"))]
    pub search: Option<String>,
    pub role: Option<Role>,
}

/// Body for PATCH /users
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangeRoleRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    pub role: Role,
}

/// Body for PATCH /users/{email}
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(url(message = "Image must be a URL"))]
    pub image: Option<String>,
}

/// Body for PATCH /users/suspend/{id}
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SuspendRequest {
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Feedback must be at most 2000 characters"))]
    pub feedback: String,
}
