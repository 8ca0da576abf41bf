//! TransactionalRepository trait implementation for SQLite

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::TransactionalRepository;
use crate::data::types::{
    ApplicationRow, ApplicationStatus, CancelOutcome, FeePayment, FeeUpdateOutcome, IdentityRow,
    ListIdentitiesParams, LoanRow, LoanUpdate, NewApplication, NewLoan, Role,
};

use super::SqliteService;
use super::repositories::{application, identity, loan};

#[async_trait]
impl TransactionalRepository for Arc<SqliteService> {
    // ==================== Identity Operations ====================

    async fn upsert_identity(
        &self,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<IdentityRow, DataError> {
        identity::upsert_identity(self.pool(), email, name, image)
            .await
            .map_err(Into::into)
    }

    async fn get_identity_by_email(&self, email: &str) -> Result<Option<IdentityRow>, DataError> {
        identity::get_by_email(self.pool(), email)
            .await
            .map_err(Into::into)
    }

    async fn get_identity(&self, id: &str) -> Result<Option<IdentityRow>, DataError> {
        identity::get_identity(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn list_identities(
        &self,
        params: &ListIdentitiesParams,
    ) -> Result<(Vec<IdentityRow>, u64), DataError> {
        identity::list_identities(self.pool(), params)
            .await
            .map_err(Into::into)
    }

    async fn set_identity_role(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<IdentityRow>, DataError> {
        identity::set_role(self.pool(), email, role)
            .await
            .map_err(Into::into)
    }

    async fn update_identity_profile(
        &self,
        email: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<Option<IdentityRow>, DataError> {
        identity::update_profile(self.pool(), email, name, image)
            .await
            .map_err(Into::into)
    }

    async fn suspend_identity(
        &self,
        id: &str,
        reason: &str,
        feedback: &str,
    ) -> Result<Option<IdentityRow>, DataError> {
        identity::suspend(self.pool(), id, reason, feedback)
            .await
            .map_err(Into::into)
    }

    // ==================== Loan Operations ====================

    async fn create_loan(&self, new_loan: &NewLoan) -> Result<LoanRow, DataError> {
        loan::create_loan(self.pool(), new_loan)
            .await
            .map_err(Into::into)
    }

    async fn get_loan(&self, id: &str) -> Result<Option<LoanRow>, DataError> {
        loan::get_loan(self.pool(), id).await.map_err(Into::into)
    }

    async fn update_loan(
        &self,
        id: &str,
        update: &LoanUpdate,
    ) -> Result<Option<LoanRow>, DataError> {
        loan::update_loan(self.pool(), id, update)
            .await
            .map_err(Into::into)
    }

    async fn delete_loan(&self, id: &str) -> Result<bool, DataError> {
        loan::delete_loan(self.pool(), id).await.map_err(Into::into)
    }

    // ==================== Application Operations ====================

    async fn create_application(
        &self,
        new_application: &NewApplication,
    ) -> Result<ApplicationRow, DataError> {
        application::create_application(self.pool(), new_application)
            .await
            .map_err(Into::into)
    }

    async fn get_application(&self, id: &str) -> Result<Option<ApplicationRow>, DataError> {
        application::get_application(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn list_applications_by_status(
        &self,
        status: ApplicationStatus,
    ) -> Result<Vec<ApplicationRow>, DataError> {
        application::list_by_status(self.pool(), status)
            .await
            .map_err(Into::into)
    }

    async fn list_applications_for_user(
        &self,
        user_email: &str,
    ) -> Result<Vec<ApplicationRow>, DataError> {
        application::list_for_user(self.pool(), user_email)
            .await
            .map_err(Into::into)
    }

    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationRow>, DataError> {
        application::update_status(self.pool(), id, status)
            .await
            .map_err(Into::into)
    }

    async fn cancel_application(
        &self,
        id: &str,
        user_email: &str,
    ) -> Result<CancelOutcome, DataError> {
        application::cancel_application(self.pool(), id, user_email)
            .await
            .map_err(Into::into)
    }

    async fn mark_fee_paid(
        &self,
        id: &str,
        payment: &FeePayment,
    ) -> Result<FeeUpdateOutcome, DataError> {
        application::mark_fee_paid(self.pool(), id, payment)
            .await
            .map_err(Into::into)
    }
}
