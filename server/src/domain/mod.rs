//! Domain logic for loan tracking
//!
//! - `access` - role sets and the pure authorization decision
//! - `payments` - checkout creation and payment reconciliation

pub mod access;
pub mod payments;

pub use access::{Decision, DenyReason, RoleSet, authorize};
