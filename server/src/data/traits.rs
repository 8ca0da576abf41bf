//! Repository trait for the transactional store
//!
//! Handlers and the role guard depend on this trait rather than on SQLite directly,
//! so tests can substitute a failing or scripted store.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{
    ApplicationRow, ApplicationStatus, CancelOutcome, FeePayment, FeeUpdateOutcome, IdentityRow,
    ListIdentitiesParams, LoanRow, LoanUpdate, NewApplication, NewLoan, Role,
};

#[async_trait]
pub trait TransactionalRepository: Send + Sync {
    // ==================== Identity Operations ====================

    /// Register on first sight (as borrower) or refresh `last_logged_in`
    async fn upsert_identity(
        &self,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<IdentityRow, DataError>;

    /// Identity lookup used by the role guard on every request
    async fn get_identity_by_email(&self, email: &str) -> Result<Option<IdentityRow>, DataError>;

    async fn get_identity(&self, id: &str) -> Result<Option<IdentityRow>, DataError>;

    /// Paged directory listing, returns rows and the total match count
    async fn list_identities(
        &self,
        params: &ListIdentitiesParams,
    ) -> Result<(Vec<IdentityRow>, u64), DataError>;

    async fn set_identity_role(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<IdentityRow>, DataError>;

    async fn update_identity_profile(
        &self,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<Option<IdentityRow>, DataError>;

    async fn suspend_identity(
        &self,
        id: &str,
        reason: &str,
        feedback: &str,
    ) -> Result<Option<IdentityRow>, DataError>;

    // ==================== Loan Operations ====================

    async fn create_loan(&self, loan: &NewLoan) -> Result<LoanRow, DataError>;

    async fn get_loan(&self, id: &str) -> Result<Option<LoanRow>, DataError>;

    async fn update_loan(&self, id: &str, update: &LoanUpdate)
    -> Result<Option<LoanRow>, DataError>;

    async fn delete_loan(&self, id: &str) -> Result<bool, DataError>;

    // ==================== Application Operations ====================

    async fn create_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationRow, DataError>;

    async fn get_application(&self, id: &str) -> Result<Option<ApplicationRow>, DataError>;

    async fn list_applications_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<ApplicationRow>, DataError>;

    async fn list_applications_for_user(
        &self,
        user_email: &str,
    ) -> Result<Vec<ApplicationRow>, DataError>;

    /// Set review status; `approved_at` is stamped only on entering `Approved`
    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationRow>, DataError>;

    async fn cancel_application(
        &self,
        id: &str,
        user_email: &str,
    ) -> Result<CancelOutcome, DataError>;

    /// Conditional `Unpaid -> Paid` transition; never overwrites an earlier payment
    async fn mark_fee_paid(
        &self,
        id: &str,
        payment: &FeePayment,
    ) -> Result<FeeUpdateOutcome, DataError>;
}
