//! Payment reconciliation
//!
//! Confirms a checkout with the processor and records the fee payment on the
//! linked application. Everything written comes from the processor's copy of the
//! session; the caller only supplies the session id. Repeated calls for the same
//! session converge on the first recorded payment.

use std::sync::Arc;

use thiserror::Error;

use super::processor::{CheckoutSession, PaymentProcessor, ProcessorError};
use crate::core::constants::{MAX_SESSION_ID_LENGTH, METADATA_APPLICATION_ID, METADATA_BORROWER};
use crate::data::types::{FeePayment, FeeUpdateOutcome};
use crate::data::{DataError, TransactionalRepository};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid session id")]
    InvalidSessionId,
    #[error("Checkout session not found")]
    SessionNotFound,
    #[error("Payment not completed")]
    NotPaid,
    #[error("Checkout session carries no loan application")]
    MissingLinkage,
    #[error("Linked loan application does not exist")]
    LinkageNotFound,
    #[error(transparent)]
    Processor(ProcessorError),
    #[error(transparent)]
    Store(#[from] DataError),
}

impl From<ProcessorError> for ReconcileError {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::NotFound(_) => Self::SessionNotFound,
            other => Self::Processor(other),
        }
    }
}

/// Result of a successful confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub loan_application_id: String,
    pub stripe_payment_id: String,
    /// `false` when an earlier call already recorded the payment
    pub newly_recorded: bool,
}

/// Non-empty, bounded, `[A-Za-z0-9_]` only
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LENGTH
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Payment provenance derived from the processor record only
fn payment_from_session(session: &CheckoutSession) -> FeePayment {
    let stripe_payment_id = session
        .payment_intent
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&session.id)
        .to_string();

    let metadata_email = session.metadata_value(METADATA_BORROWER);
    let payment_email = session
        .customer_email
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            session
                .customer_details
                .as_ref()
                .and_then(|d| d.email.clone())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| metadata_email.map(str::to_string));

    FeePayment {
        stripe_payment_id,
        payment_email,
        payment_amount: session.amount_total.unwrap_or(0) as f64 / 100.0,
    }
}

pub struct ReconcileService {
    store: Arc<dyn TransactionalRepository>,
    processor: Arc<dyn PaymentProcessor>,
}

impl ReconcileService {
    pub fn new(
        store: Arc<dyn TransactionalRepository>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self { store, processor }
    }

    pub async fn confirm(&self, session_id: &str) -> Result<Reconciled, ReconcileError> {
        if !is_valid_session_id(session_id) {
            return Err(ReconcileError::InvalidSessionId);
        }

        let session = self.processor.retrieve_checkout_session(session_id).await?;

        if !session.is_paid() {
            tracing::debug!(
                session_id,
                payment_status = %session.payment_status,
                "Checkout not paid"
            );
            return Err(ReconcileError::NotPaid);
        }

        let application_id = session
            .metadata_value(METADATA_APPLICATION_ID)
            .ok_or(ReconcileError::MissingLinkage)?
            .to_string();

        let payment = payment_from_session(&session);
        match self.store.mark_fee_paid(&application_id, &payment).await? {
            FeeUpdateOutcome::Applied(row) => {
                tracing::info!(
                    application_id = %row.id,
                    stripe_payment_id = %payment.stripe_payment_id,
                    "Application fee recorded"
                );
                Ok(Reconciled {
                    loan_application_id: row.id,
                    stripe_payment_id: payment.stripe_payment_id,
                    newly_recorded: true,
                })
            }
            FeeUpdateOutcome::AlreadyPaid(row) => {
                tracing::debug!(application_id = %row.id, "Application fee already recorded");
                Ok(Reconciled {
                    stripe_payment_id: row
                        .stripe_payment_id
                        .unwrap_or(payment.stripe_payment_id),
                    loan_application_id: row.id,
                    newly_recorded: false,
                })
            }
            FeeUpdateOutcome::NotFound => {
                tracing::error!(
                    session_id,
                    application_id = %application_id,
                    stripe_payment_id = %payment.stripe_payment_id,
                    amount = payment.payment_amount,
                    "Paid checkout has no matching application; refund required"
                );
                Err(ReconcileError::LinkageNotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TransactionalService;
    use crate::data::types::{CancelOutcome, FeeStatus, NewApplication};
    use crate::domain::payments::processor::CustomerDetails;
    use crate::domain::payments::processor::fake::{FakeProcessor, paid_session};

    async fn store_with_application() -> (Arc<dyn TransactionalRepository>, String) {
        let store = TransactionalService::in_memory()
            .await
            .unwrap()
            .repository();
        let id = store
            .create_application(&NewApplication {
                loan_id: "loan-1".to_string(),
                loan_title: "Education Loan".to_string(),
                user_email: "ana@example.com".to_string(),
                loan_amount: 5000.0,
                details: serde_json::json!({}),
            })
            .await
            .unwrap()
            .id;
        (store, id)
    }

    #[test]
    fn test_session_id_validation() {
        assert!(is_valid_session_id("cs_test_a1B2c3"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("cs test"));
        assert!(!is_valid_session_id("cs_test/../x"));
        assert!(!is_valid_session_id(&"a".repeat(MAX_SESSION_ID_LENGTH + 1)));
        assert!(is_valid_session_id(&"a".repeat(MAX_SESSION_ID_LENGTH)));
    }

    #[test]
    fn test_payment_fallbacks() {
        let mut session = paid_session("cs_1", "app-1");
        session.payment_intent = None;
        session.customer_details = None;
        let payment = payment_from_session(&session);
        assert_eq!(payment.stripe_payment_id, "cs_1");
        assert_eq!(payment.payment_email.as_deref(), Some("ana@example.com"));
        assert_eq!(payment.payment_amount, 10.0);

        session.customer_email = Some("direct@example.com".to_string());
        session.customer_details = Some(CustomerDetails {
            email: Some("details@example.com".to_string()),
        });
        assert_eq!(
            payment_from_session(&session).payment_email.as_deref(),
            Some("direct@example.com")
        );
    }

    #[tokio::test]
    async fn test_confirm_records_payment_once() {
        let (store, id) = store_with_application().await;
        let processor =
            Arc::new(FakeProcessor::new().with_session(paid_session("cs_test_1", &id)));
        let service = ReconcileService::new(store.clone(), processor.clone());

        let first = service.confirm("cs_test_1").await.unwrap();
        assert!(first.newly_recorded);
        assert_eq!(first.loan_application_id, id);
        assert_eq!(first.stripe_payment_id, "pi_cs_test_1");
        let after_first = store.get_application(&id).await.unwrap().unwrap();
        assert_eq!(after_first.application_fee_status, FeeStatus::Paid);
        assert_eq!(
            after_first.payment_email.as_deref(),
            Some("payer@example.com")
        );

        let second = service.confirm("cs_test_1").await.unwrap();
        assert!(!second.newly_recorded);
        assert_eq!(second.stripe_payment_id, first.stripe_payment_id);
        let after_second = store.get_application(&id).await.unwrap().unwrap();
        assert_eq!(after_second.paid_at, after_first.paid_at);
        assert_eq!(after_second.updated_at, after_first.updated_at);
        assert_eq!(processor.retrievals(), 2);
    }

    #[tokio::test]
    async fn test_unpaid_session_mutates_nothing() {
        let (store, id) = store_with_application().await;
        let mut session = paid_session("cs_test_2", &id);
        session.payment_status = "unpaid".to_string();
        let service = ReconcileService::new(
            store.clone(),
            Arc::new(FakeProcessor::new().with_session(session)),
        );

        assert!(matches!(
            service.confirm("cs_test_2").await,
            Err(ReconcileError::NotPaid)
        ));
        let app = store.get_application(&id).await.unwrap().unwrap();
        assert_eq!(app.application_fee_status, FeeStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_missing_and_unknown_linkage() {
        let (store, _) = store_with_application().await;
        let mut no_link = paid_session("cs_nolink", "x");
        no_link.metadata.remove("loanApplicationId");
        let processor = FakeProcessor::new()
            .with_session(no_link)
            .with_session(paid_session("cs_ghost", "does-not-exist"));
        let service = ReconcileService::new(store, Arc::new(processor));

        assert!(matches!(
            service.confirm("cs_nolink").await,
            Err(ReconcileError::MissingLinkage)
        ));
        assert!(matches!(
            service.confirm("cs_ghost").await,
            Err(ReconcileError::LinkageNotFound)
        ));
    }

    #[tokio::test]
    async fn test_paid_checkout_for_withdrawn_application() {
        let (store, id) = store_with_application().await;
        let processor =
            Arc::new(FakeProcessor::new().with_session(paid_session("cs_withdrawn", &id)));
        let service = ReconcileService::new(store.clone(), processor.clone());

        let withdrawn = store.cancel_application(&id, "ana@example.com").await;
        assert_eq!(withdrawn.unwrap(), CancelOutcome::Deleted);

        assert!(matches!(
            service.confirm("cs_withdrawn").await,
            Err(ReconcileError::LinkageNotFound)
        ));
        assert_eq!(processor.retrievals(), 1);
        assert!(store.get_application(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_id_never_reaches_processor() {
        let (store, _) = store_with_application().await;
        let processor = Arc::new(FakeProcessor::new());
        let service = ReconcileService::new(store, processor.clone());

        assert!(matches!(
            service.confirm("bad id!").await,
            Err(ReconcileError::InvalidSessionId)
        ));
        assert_eq!(processor.retrievals(), 0);
    }

    #[tokio::test]
    async fn test_processor_failures() {
        let (store, _) = store_with_application().await;
        let service = ReconcileService::new(store.clone(), Arc::new(FakeProcessor::new()));
        assert!(matches!(
            service.confirm("cs_unknown").await,
            Err(ReconcileError::SessionNotFound)
        ));

        let service = ReconcileService::new(store, Arc::new(FakeProcessor::unavailable()));
        assert!(matches!(
            service.confirm("cs_any").await,
            Err(ReconcileError::Processor(_))
        ));
    }
}
