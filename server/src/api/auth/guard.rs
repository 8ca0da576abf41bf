//! Role guard service
//!
//! Loads the caller's identity on every request and runs the access decision.
//! Injected into request extensions so extractors can reach it without the
//! handler's state type.

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::credential::VerifiedSubject;
use crate::data::TransactionalRepository;
use crate::data::types::{IdentityRow, Role};
use crate::domain::access::{Decision, DenyReason, RoleSet, authorize};

/// Why the guard refused a request
#[derive(Debug)]
pub enum GuardRejection {
    /// Unregistered, or the stored role is outside the permitted set
    Denied {
        permitted: RoleSet,
        actual_role: Option<Role>,
    },
    Suspended {
        permitted: RoleSet,
        actual_role: Option<Role>,
    },
    /// The identity could not be loaded; never treated as a pass
    StoreUnavailable,
    /// Guard used on a route without the auth middleware
    MissingContext,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Denied {
                permitted,
                actual_role,
            } => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "forbidden",
                    "code": "ROLE_NOT_PERMITTED",
                    "message": permitted.denial_message(),
                    "role": actual_role,
                    "permitted": permitted.roles(),
                })),
            )
                .into_response(),
            Self::Suspended {
                permitted,
                actual_role,
            } => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "forbidden",
                    "code": "IDENTITY_SUSPENDED",
                    "message": permitted.denial_message(),
                    "role": actual_role,
                    "permitted": permitted.roles(),
                })),
            )
                .into_response(),
            Self::StoreUnavailable | Self::MissingContext => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "code": "INTERNAL",
                    "message": "Server error",
                })),
            )
                .into_response(),
        }
    }
}

pub struct RoleGuard {
    store: Arc<dyn TransactionalRepository>,
}

impl RoleGuard {
    pub fn new(store: Arc<dyn TransactionalRepository>) -> Self {
        Self { store }
    }

    /// Load the subject's identity and check it against `permitted`
    ///
    /// Reads the store every time so role and status changes apply to the very
    /// next request.
    pub async fn check(
        &self,
        subject: &VerifiedSubject,
        permitted: RoleSet,
    ) -> Result<IdentityRow, GuardRejection> {
        let identity = self
            .store
            .get_identity_by_email(&subject.email)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Role lookup failed");
                GuardRejection::StoreUnavailable
            })?;

        match authorize(permitted, identity.as_ref()) {
            Decision::Allow => identity.ok_or(GuardRejection::StoreUnavailable),
            Decision::Deny {
                actual_role,
                reason,
            } => {
                tracing::debug!(
                    email = %subject.email,
                    permitted = %permitted,
                    ?reason,
                    "Role guard denied request"
                );
                Err(match reason {
                    DenyReason::Suspended => GuardRejection::Suspended {
                        permitted,
                        actual_role,
                    },
                    DenyReason::Unregistered | DenyReason::RoleNotPermitted => {
                        GuardRejection::Denied {
                            permitted,
                            actual_role,
                        }
                    }
                })
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TransactionalService;

    async fn guard_with(email: &str, role: Role) -> (RoleGuard, Arc<dyn TransactionalRepository>) {
        let service = TransactionalService::in_memory().await.unwrap();
        let store = service.repository();
        store.upsert_identity(email, None, None).await.unwrap();
        store.set_identity_role(email, role).await.unwrap();
        (RoleGuard::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_allows_permitted_role() {
        let (guard, _) = guard_with("ana@example.com", Role::Manager).await;
        let subject = VerifiedSubject::new("uid-1", "ana@example.com");
        let identity = guard
            .check(&subject, RoleSet::of(&[Role::Admin, Role::Manager]))
            .await
            .unwrap();
        assert_eq!(identity.role, Role::Manager);
    }

    #[tokio::test]
    async fn test_denies_other_roles_and_unregistered() {
        let (guard, _) = guard_with("ana@example.com", Role::Borrower).await;

        let denied = guard
            .check(
                &VerifiedSubject::new("uid-1", "ana@example.com"),
                RoleSet::only(Role::Admin),
            )
            .await;
        assert!(matches!(
            denied,
            Err(GuardRejection::Denied {
                actual_role: Some(Role::Borrower),
                ..
            })
        ));

        let unknown = guard
            .check(
                &VerifiedSubject::new("uid-2", "bo@example.com"),
                RoleSet::only(Role::Borrower),
            )
            .await;
        assert!(matches!(
            unknown,
            Err(GuardRejection::Denied {
                actual_role: None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_role_change_applies_to_next_check() {
        let (guard, store) = guard_with("ana@example.com", Role::Borrower).await;
        let subject = VerifiedSubject::new("uid-1", "ana@example.com");
        let managers = RoleSet::only(Role::Manager);

        assert!(guard.check(&subject, managers).await.is_err());
        store
            .set_identity_role("ana@example.com", Role::Manager)
            .await
            .unwrap();
        assert!(guard.check(&subject, managers).await.is_ok());
    }

    #[tokio::test]
    async fn test_suspended_identity_is_blocked() {
        let (guard, store) = guard_with("ana@example.com", Role::Admin).await;
        let identity = store
            .get_identity_by_email("ana@example.com")
            .await
            .unwrap()
            .unwrap();
        store
            .suspend_identity(&identity.id, "fraud", "contact support")
            .await
            .unwrap();

        let result = guard
            .check(
                &VerifiedSubject::new("uid-1", "ana@example.com"),
                RoleSet::only(Role::Admin),
            )
            .await;
        assert!(matches!(result, Err(GuardRejection::Suspended { .. })));
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let guard = RoleGuard::new(Arc::new(test_support::FailingStore));
        let result = guard
            .check(
                &VerifiedSubject::new("uid-1", "ana@example.com"),
                RoleSet::of(&Role::ALL),
            )
            .await;
        assert!(matches!(result, Err(GuardRejection::StoreUnavailable)));
    }
}
