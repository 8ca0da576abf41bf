//! Shared data types for the transactional store

mod enums;
mod transactional;

pub use enums::{ApplicationStatus, FeeStatus, IdentityStatus, Role};

pub use transactional::{
    ApplicationRow, CancelOutcome, FeePayment, FeeUpdateOutcome, IdentityRow, ListIdentitiesParams,
    LoanRow, LoanUpdate, NewApplication, NewLoan,
};
