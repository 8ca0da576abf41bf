//! Checkout orchestration
//!
//! Turns a fee payment request into a processor checkout session. Nothing is
//! written locally: the application only changes when reconciliation confirms
//! the payment with the processor.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use super::processor::{CheckoutRequest, PaymentProcessor, ProcessorError};
use crate::core::constants::{
    CHECKOUT_CURRENCY, CHECKOUT_SESSION_PLACEHOLDER, METADATA_APPLICATION_ID, METADATA_BORROWER,
};
use crate::data::DataError;
use crate::data::TransactionalRepository;
use crate::data::types::FeeStatus;

/// Largest accepted amount in major units
const MAX_CHECKOUT_AMOUNT: f64 = 1_000_000_000.0;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Amount must be a positive number")]
    InvalidAmount,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Loan title is required")]
    MissingTitle,
    #[error("Loan application not found")]
    UnknownApplication,
    #[error("Application fee is already paid")]
    AlreadyPaid,
    #[error("Processor returned no redirect URL")]
    MissingRedirect,
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Store(#[from] DataError),
}

/// Caller-supplied fee payment details
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub loan_title: String,
    pub amount: f64,
    pub image: Option<String>,
    pub quantity: u32,
    pub borrower_email: String,
    pub loan_application_id: String,
}

/// `round(amount * 100)`, rejecting non-finite, non-positive and absurd amounts
pub fn to_minor_units(amount: f64) -> Result<i64, CheckoutError> {
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_CHECKOUT_AMOUNT {
        return Err(CheckoutError::InvalidAmount);
    }
    let cents = (amount * 100.0).round();
    if cents < 1.0 {
        return Err(CheckoutError::InvalidAmount);
    }
    Ok(cents as i64)
}

pub struct CheckoutService {
    store: Arc<dyn TransactionalRepository>,
    processor: Arc<dyn PaymentProcessor>,
    site_domain: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn TransactionalRepository>,
        processor: Arc<dyn PaymentProcessor>,
        site_domain: &str,
    ) -> Self {
        Self {
            store,
            processor,
            site_domain: site_domain.trim_end_matches('/').to_string(),
        }
    }

    /// Build the processor request without side effects
    pub fn build_request(&self, input: &CheckoutInput) -> Result<CheckoutRequest, CheckoutError> {
        let title = input.loan_title.trim();
        if title.is_empty() {
            return Err(CheckoutError::MissingTitle);
        }
        if input.quantity < 1 {
            return Err(CheckoutError::InvalidQuantity);
        }
        let unit_amount = to_minor_units(input.amount)?;

        let mut metadata = BTreeMap::new();
        metadata.insert(
            METADATA_APPLICATION_ID.to_string(),
            input.loan_application_id.clone(),
        );
        metadata.insert(METADATA_BORROWER.to_string(), input.borrower_email.clone());

        Ok(CheckoutRequest {
            product_name: title.to_string(),
            description: format!("${}", input.amount),
            image: input
                .image
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            currency: CHECKOUT_CURRENCY.to_string(),
            unit_amount,
            quantity: input.quantity,
            customer_email: input.borrower_email.clone(),
            metadata,
            success_url: format!(
                "{}/payment-success?session_id={}",
                self.site_domain, CHECKOUT_SESSION_PLACEHOLDER
            ),
            cancel_url: format!("{}/loans", self.site_domain),
        })
    }

    /// Validate, confirm the application is payable, and return the redirect URL
    pub async fn create(&self, input: &CheckoutInput) -> Result<String, CheckoutError> {
        let request = self.build_request(input)?;

        let application = self
            .store
            .get_application(&input.loan_application_id)
            .await?
            .ok_or(CheckoutError::UnknownApplication)?;
        if application.application_fee_status == FeeStatus::Paid {
            return Err(CheckoutError::AlreadyPaid);
        }

        let session = self.processor.create_checkout_session(&request).await?;
        tracing::debug!(
            session_id = %session.id,
            application_id = %input.loan_application_id,
            "Checkout session created"
        );
        session.url.ok_or(CheckoutError::MissingRedirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TransactionalService;
    use crate::data::types::{FeePayment, NewApplication};
    use crate::domain::payments::processor::fake::FakeProcessor;

    fn input(application_id: &str) -> CheckoutInput {
        CheckoutInput {
            loan_title: "Education Loan".to_string(),
            amount: 10.0,
            image: None,
            quantity: 1,
            borrower_email: "ana@example.com".to_string(),
            loan_application_id: application_id.to_string(),
        }
    }

    async fn setup() -> (CheckoutService, Arc<FakeProcessor>, Arc<dyn TransactionalRepository>) {
        let store = TransactionalService::in_memory()
            .await
            .unwrap()
            .repository();
        let processor = Arc::new(FakeProcessor::new());
        let service = CheckoutService::new(
            store.clone(),
            processor.clone(),
            "https://rintrack.example.com/",
        );
        (service, processor, store)
    }

    async fn new_application(store: &Arc<dyn TransactionalRepository>) -> String {
        store
            .create_application(&NewApplication {
                loan_id: "loan-1".to_string(),
                loan_title: "Education Loan".to_string(),
                user_email: "ana@example.com".to_string(),
                loan_amount: 5000.0,
                details: serde_json::json!({}),
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_to_minor_units_rounds() {
        assert_eq!(to_minor_units(10.0).unwrap(), 1000);
        assert_eq!(to_minor_units(19.999).unwrap(), 2000);
        assert!(to_minor_units(0.0).is_err());
        assert!(to_minor_units(-5.0).is_err());
        assert!(to_minor_units(f64::NAN).is_err());
        assert!(to_minor_units(f64::INFINITY).is_err());
        assert!(to_minor_units(0.001).is_err());
    }

    #[tokio::test]
    async fn test_build_request_shape() {
        let (service, _, _) = setup().await;
        let request = service.build_request(&input("app-1")).unwrap();

        assert_eq!(request.unit_amount, 1000);
        assert_eq!(request.description, "$10");
        assert_eq!(request.currency, "usd");
        assert_eq!(request.metadata["loanApplicationId"], "app-1");
        assert_eq!(request.metadata["borrower"], "ana@example.com");
        assert_eq!(
            request.success_url,
            "https://rintrack.example.com/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(request.cancel_url, "https://rintrack.example.com/loans");
    }

    #[tokio::test]
    async fn test_build_request_rejects_bad_input() {
        let (service, _, _) = setup().await;

        let mut bad = input("app-1");
        bad.quantity = 0;
        assert!(matches!(
            service.build_request(&bad),
            Err(CheckoutError::InvalidQuantity)
        ));

        let mut bad = input("app-1");
        bad.loan_title = "   ".to_string();
        assert!(matches!(
            service.build_request(&bad),
            Err(CheckoutError::MissingTitle)
        ));
    }

    #[tokio::test]
    async fn test_create_returns_redirect_and_writes_nothing() {
        let (service, processor, store) = setup().await;
        let id = new_application(&store).await;

        let url = service.create(&input(&id)).await.unwrap();
        assert!(url.starts_with("https://checkout.example.com/pay/"));
        assert_eq!(processor.created().len(), 1);

        let app = store.get_application(&id).await.unwrap().unwrap();
        assert_eq!(app.application_fee_status, FeeStatus::Unpaid);
        assert!(app.stripe_payment_id.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_or_paid_application() {
        let (service, processor, store) = setup().await;

        assert!(matches!(
            service.create(&input("missing")).await,
            Err(CheckoutError::UnknownApplication)
        ));

        let id = new_application(&store).await;
        store
            .mark_fee_paid(
                &id,
                &FeePayment {
                    stripe_payment_id: "pi_1".to_string(),
                    payment_email: None,
                    payment_amount: 10.0,
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            service.create(&input(&id)).await,
            Err(CheckoutError::AlreadyPaid)
        ));
        assert!(processor.created().is_empty());
    }
}
