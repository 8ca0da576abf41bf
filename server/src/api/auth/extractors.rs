//! Authorization extractors for Axum handlers
//!
//! `Auth` yields the verified subject placed by `require_auth`. `RequireRole<P>`
//! additionally runs the role guard for the permit `P` before the handler body.
//!
//! # Usage
//!
//! ```no_run
//! # use rintrack_server::api::auth::{AdminOrManager, RequireRole};
//! # use rintrack_server::api::types::ApiError;
//! pub async fn delete_loan(auth: RequireRole<AdminOrManager>) -> Result<(), ApiError> {
//!     // auth.subject - verified caller
//!     // auth.identity - stored identity, loaded for this request
//!     Ok(())
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::credential::VerifiedSubject;
use super::guard::{GuardRejection, RoleGuard};
use super::middleware::AuthError;
use crate::data::types::{IdentityRow, Role};
use crate::domain::access::RoleSet;

// ============================================================================
// Permit Markers
// ============================================================================

/// Marker trait naming the roles an endpoint admits
pub trait Permit: Send + Sync + 'static {
    const ROLES: RoleSet;
}

pub struct AdminOnly;
impl Permit for AdminOnly {
    const ROLES: RoleSet = RoleSet::only(Role::Admin);
}

pub struct ManagerOnly;
impl Permit for ManagerOnly {
    const ROLES: RoleSet = RoleSet::only(Role::Manager);
}

pub struct BorrowerOnly;
impl Permit for BorrowerOnly {
    const ROLES: RoleSet = RoleSet::only(Role::Borrower);
}

pub struct AdminOrManager;
impl Permit for AdminOrManager {
    const ROLES: RoleSet = AdminOnly::ROLES.union(ManagerOnly::ROLES);
}

// ============================================================================
// Extractors
// ============================================================================

/// The verified caller, for endpoints that need a login but no role
pub struct Auth(pub VerifiedSubject);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedSubject>()
            .cloned()
            .map(Self)
            .ok_or_else(AuthError::unauthenticated)
    }
}

/// Verified caller whose stored identity holds a role admitted by `P`
pub struct RequireRole<P: Permit> {
    pub subject: VerifiedSubject,
    pub identity: IdentityRow,
    _permit: PhantomData<P>,
}

impl<P: Permit> RequireRole<P> {
    /// Email of the caller, the key used for ownership checks
    pub fn email(&self) -> &str {
        &self.subject.email
    }
}

/// Rejection for `RequireRole`
pub enum RoleRejection {
    Unauthenticated(AuthError),
    Guard(GuardRejection),
}

impl axum::response::IntoResponse for RoleRejection {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Unauthenticated(e) => e.into_response(),
            Self::Guard(e) => e.into_response(),
        }
    }
}

impl<S, P> FromRequestParts<S> for RequireRole<P>
where
    S: Send + Sync,
    P: Permit,
{
    type Rejection = RoleRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(subject) = Auth::from_request_parts(parts, state)
            .await
            .map_err(RoleRejection::Unauthenticated)?;

        let guard = parts
            .extensions
            .get::<Arc<RoleGuard>>()
            .cloned()
            .ok_or(RoleRejection::Guard(GuardRejection::MissingContext))?;

        let identity = guard
            .check(&subject, P::ROLES)
            .await
            .map_err(RoleRejection::Guard)?;

        Ok(Self {
            subject,
            identity,
            _permit: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_sets() {
        assert_eq!(AdminOnly::ROLES.roles(), vec![Role::Admin]);
        assert_eq!(
            AdminOrManager::ROLES.denial_message(),
            "admin or manager only actions!"
        );
        assert!(BorrowerOnly::ROLES.contains(Role::Borrower));
        assert!(!ManagerOnly::ROLES.contains(Role::Admin));
    }
}
