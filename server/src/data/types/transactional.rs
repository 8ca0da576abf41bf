//! Row and parameter types for identities, loans and loan applications

use serde::{Deserialize, Serialize};

use super::enums::{ApplicationStatus, FeeStatus, IdentityStatus, Role};

// ============================================================================
// Identity types
// ============================================================================

/// Identity row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRow {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub status: IdentityStatus,
    pub suspend_reason: Option<String>,
    pub suspend_feedback: Option<String>,
    pub suspended_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_logged_in: i64,
}

impl IdentityRow {
    pub fn is_active(&self) -> bool {
        self.status == IdentityStatus::Active
    }
}

/// Filters for the admin user directory
#[derive(Debug, Clone)]
pub struct ListIdentitiesParams {
    /// The caller; never listed
    pub exclude_email: String,
    /// Case-insensitive substring over name and email
    pub search: Option<String>,
    pub role: Option<Role>,
    pub page: u32,
    pub limit: u32,
}

// ============================================================================
// Loan types
// ============================================================================

/// Loan product row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: Option<String>,
    pub interest_rate: f64,
    pub max_loan_limit: f64,
    pub required_documents: Vec<String>,
    pub emi_plans: Vec<String>,
    pub show_on_home: bool,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewLoan {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: Option<String>,
    pub interest_rate: f64,
    pub max_loan_limit: f64,
    pub required_documents: Vec<String>,
    pub emi_plans: Vec<String>,
    pub show_on_home: bool,
    pub created_by: String,
}

/// Partial loan update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct LoanUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub interest_rate: Option<f64>,
    pub max_loan_limit: Option<f64>,
    pub required_documents: Option<Vec<String>>,
    pub emi_plans: Option<Vec<String>>,
    pub show_on_home: Option<bool>,
}

impl LoanUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.image.is_none()
            && self.interest_rate.is_none()
            && self.max_loan_limit.is_none()
            && self.required_documents.is_none()
            && self.emi_plans.is_none()
            && self.show_on_home.is_none()
    }
}

// ============================================================================
// Loan application types
// ============================================================================

/// Loan application row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub id: String,
    pub loan_id: String,
    pub loan_title: String,
    pub user_email: String,
    pub loan_amount: f64,
    pub status: ApplicationStatus,
    pub application_fee_status: FeeStatus,
    pub approved_at: Option<i64>,
    pub stripe_payment_id: Option<String>,
    pub payment_email: Option<String>,
    pub payment_amount: Option<f64>,
    pub paid_at: Option<i64>,
    /// Free-form applicant particulars (contact, income, reason, ...)
    pub details: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

/// New application; status and fee state always start at their defaults
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub loan_id: String,
    pub loan_title: String,
    pub user_email: String,
    pub loan_amount: f64,
    pub details: serde_json::Value,
}

/// Payment provenance recorded when the fee transitions to `Paid`
#[derive(Debug, Clone)]
pub struct FeePayment {
    pub stripe_payment_id: String,
    pub payment_email: Option<String>,
    pub payment_amount: f64,
}

/// Result of the conditional fee update
#[derive(Debug, Clone)]
pub enum FeeUpdateOutcome {
    /// This call moved the application to `Paid`
    Applied(ApplicationRow),
    /// An earlier call already did; the row is unchanged
    AlreadyPaid(ApplicationRow),
    NotFound,
}

/// Result of a borrower cancelling their own application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Deleted,
    /// Missing, or owned by someone else
    NotFound,
    /// Already decided or paid
    Locked,
}
