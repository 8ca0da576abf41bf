//! SQLite repositories
//!
//! Row types (IdentityRow, LoanRow, etc.) should be imported from `crate::data::types`.

pub mod application;
pub mod identity;
pub mod loan;

pub use application::{
    cancel_application, create_application, get_application, list_by_status, list_for_user,
    mark_fee_paid, update_status,
};
pub use identity::{
    get_by_email, get_identity, list_identities, set_role, suspend, update_profile,
    upsert_identity,
};
pub use loan::{create_loan, delete_loan, get_loan, update_loan};
