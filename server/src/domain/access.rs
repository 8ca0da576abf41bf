//! Role-based access decisions
//!
//! `authorize` is the single place that decides whether a stored identity may
//! call an endpoint. It is pure: the caller loads the identity, this module only
//! compares it against a permitted `RoleSet`.

use std::fmt;

use crate::data::types::{IdentityRow, Role};

/// A set of roles permitted to call an endpoint
///
/// Guards compose by union, e.g. `RoleSet::of(&[Role::Admin, Role::Manager])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: Self = Self(0);

    const fn bit(role: Role) -> u8 {
        match role {
            Role::Admin => 1,
            Role::Manager => 1 << 1,
            Role::Borrower => 1 << 2,
        }
    }

    pub const fn only(role: Role) -> Self {
        Self(Self::bit(role))
    }

    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= Self::bit(roles[i]);
            i += 1;
        }
        Self(bits)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, role: Role) -> bool {
        self.0 & Self::bit(role) != 0
    }

    /// Permitted roles in declaration order (admin, manager, borrower)
    pub fn roles(self) -> Vec<Role> {
        Role::ALL
            .iter()
            .copied()
            .filter(|r| self.contains(*r))
            .collect()
    }

    /// Denial message, e.g. `"admin or manager only actions!"`
    pub fn denial_message(self) -> String {
        format!("{self} only actions!")
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.roles().iter().map(Role::as_str).collect();
        write!(f, "{}", names.join(" or "))
    }
}

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity record for the verified subject
    Unregistered,
    Suspended,
    RoleNotPermitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny {
        actual_role: Option<Role>,
        reason: DenyReason,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `identity` may act under `permitted`
pub fn authorize(permitted: RoleSet, identity: Option<&IdentityRow>) -> Decision {
    let Some(identity) = identity else {
        return Decision::Deny {
            actual_role: None,
            reason: DenyReason::Unregistered,
        };
    };

    if !identity.is_active() {
        return Decision::Deny {
            actual_role: Some(identity.role),
            reason: DenyReason::Suspended,
        };
    }

    if permitted.contains(identity.role) {
        Decision::Allow
    } else {
        Decision::Deny {
            actual_role: Some(identity.role),
            reason: DenyReason::RoleNotPermitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::IdentityStatus;

    fn identity(role: Role, status: IdentityStatus) -> IdentityRow {
        IdentityRow {
            id: "id-1".to_string(),
            email: "ana@example.com".to_string(),
            name: None,
            image: None,
            role,
            status,
            suspend_reason: None,
            suspend_feedback: None,
            suspended_at: None,
            created_at: 0,
            updated_at: 0,
            last_logged_in: 0,
        }
    }

    #[test]
    fn test_role_set_union_and_contains() {
        let set = RoleSet::only(Role::Admin).union(RoleSet::only(Role::Manager));
        assert_eq!(set, RoleSet::of(&[Role::Manager, Role::Admin]));
        assert!(set.contains(Role::Admin));
        assert!(set.contains(Role::Manager));
        assert!(!set.contains(Role::Borrower));
        assert!(!RoleSet::EMPTY.contains(Role::Admin));
    }

    #[test]
    fn test_denial_message_order_is_stable() {
        let set = RoleSet::of(&[Role::Manager, Role::Admin]);
        assert_eq!(set.denial_message(), "admin or manager only actions!");
        assert_eq!(
            RoleSet::only(Role::Borrower).denial_message(),
            "borrower only actions!"
        );
    }

    #[test]
    fn test_authorize_allows_permitted_role() {
        let id = identity(Role::Manager, IdentityStatus::Active);
        assert!(authorize(RoleSet::only(Role::Manager), Some(&id)).is_allowed());
        assert!(authorize(RoleSet::of(&[Role::Admin, Role::Manager]), Some(&id)).is_allowed());
    }

    #[test]
    fn test_authorize_denies_other_role() {
        let id = identity(Role::Borrower, IdentityStatus::Active);
        assert_eq!(
            authorize(RoleSet::only(Role::Admin), Some(&id)),
            Decision::Deny {
                actual_role: Some(Role::Borrower),
                reason: DenyReason::RoleNotPermitted,
            }
        );
    }

    #[test]
    fn test_authorize_denies_missing_identity() {
        assert_eq!(
            authorize(RoleSet::only(Role::Borrower), None),
            Decision::Deny {
                actual_role: None,
                reason: DenyReason::Unregistered,
            }
        );
    }

    #[test]
    fn test_authorize_denies_suspended_even_when_role_matches() {
        let id = identity(Role::Admin, IdentityStatus::Suspended);
        let decision = authorize(RoleSet::only(Role::Admin), Some(&id));
        assert!(matches!(
            decision,
            Decision::Deny {
                reason: DenyReason::Suspended,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_set_denies_everyone() {
        for role in Role::ALL {
            let id = identity(role, IdentityStatus::Active);
            assert!(!authorize(RoleSet::EMPTY, Some(&id)).is_allowed());
        }
    }
}
