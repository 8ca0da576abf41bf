//! Authentication module

mod credential;
mod extractors;
mod guard;
pub mod id_token;
pub mod issuer;
pub mod jwt;
mod manager;
pub mod middleware;

pub use credential::{Credential, VerifiedSubject};
pub use extractors::{
    AdminOnly, AdminOrManager, Auth, BorrowerOnly, ManagerOnly, Permit, RequireRole, RoleRejection,
};
pub use guard::{GuardRejection, RoleGuard};
pub use issuer::{IdAssertion, IdentityIssuer, IssuerError};
pub use jwt::SessionClaims;
pub use manager::{AuthManager, exchange_assertion, removal_cookie, session_cookie};
pub use middleware::{AuthError, AuthState, require_auth};

#[cfg(test)]
pub(crate) use guard::test_support;
