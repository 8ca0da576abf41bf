//! Closed value sets stored as TEXT columns

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Platform role of an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Borrower,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Borrower];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "borrower" => Some(Self::Borrower),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Borrower => "borrower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account standing of an identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    #[default]
    Active,
    Suspended,
}

impl IdentityStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review state of a loan application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application fee state; moves to `Paid` at most once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FeeStatus {
    #[default]
    Unpaid,
    Paid,
}

impl FeeStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Unpaid" => Some(Self::Unpaid),
            "Paid" => Some(Self::Paid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::Paid => "Paid",
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse("owner"), None);
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Borrower).unwrap(), r#""borrower""#);
        let role: Role = serde_json::from_str(r#""manager""#).unwrap();
        assert_eq!(role, Role::Manager);
    }

    #[test]
    fn test_application_status_is_case_sensitive() {
        assert_eq!(
            ApplicationStatus::parse("Approved"),
            Some(ApplicationStatus::Approved)
        );
        assert_eq!(ApplicationStatus::parse("approved"), None);
        let status: ApplicationStatus = serde_json::from_str(r#""Rejected""#).unwrap();
        assert_eq!(status, ApplicationStatus::Rejected);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(IdentityStatus::default(), IdentityStatus::Active);
        assert_eq!(ApplicationStatus::default(), ApplicationStatus::Pending);
        assert_eq!(FeeStatus::default(), FeeStatus::Unpaid);
        assert_eq!(FeeStatus::Paid.to_string(), "Paid");
    }
}
