//! Payment processor interface
//!
//! The processor owns checkout sessions. This crate only creates them and reads
//! them back; it never trusts payment data that did not come from a fresh read.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Processor rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Checkout session not found: {0}")]
    NotFound(String),
    #[error("Unexpected processor response: {0}")]
    Decode(String),
}

/// A single-line-item hosted checkout
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub product_name: String,
    pub description: String,
    pub image: Option<String>,
    pub currency: String,
    /// Price per unit in minor units (cents)
    pub unit_amount: i64,
    pub quantity: u32,
    pub customer_email: String,
    pub metadata: BTreeMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// Checkout session as reported by the processor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Total in minor units
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Metadata value, treating blank strings as absent
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProcessorError>;

    async fn retrieve_checkout_session(&self, id: &str)
    -> Result<CheckoutSession, ProcessorError>;
}

/// Scripted processor for tests
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeProcessor {
        sessions: Mutex<HashMap<String, CheckoutSession>>,
        created: Mutex<Vec<CheckoutRequest>>,
        retrievals: Mutex<u32>,
        unavailable: bool,
    }

    impl FakeProcessor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every call fails with a transport-level error
        pub fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        pub fn with_session(self, session: CheckoutSession) -> Self {
            self.sessions.lock().insert(session.id.clone(), session);
            self
        }

        pub fn created(&self) -> Vec<CheckoutRequest> {
            self.created.lock().clone()
        }

        pub fn retrievals(&self) -> u32 {
            *self.retrievals.lock()
        }
    }

    pub fn paid_session(id: &str, application_id: &str) -> CheckoutSession {
        let mut metadata = BTreeMap::new();
        metadata.insert("loanApplicationId".to_string(), application_id.to_string());
        metadata.insert("borrower".to_string(), "ana@example.com".to_string());
        CheckoutSession {
            id: id.to_string(),
            url: None,
            payment_status: "paid".to_string(),
            metadata,
            amount_total: Some(1000),
            payment_intent: Some(format!("pi_{id}")),
            customer_email: None,
            customer_details: Some(CustomerDetails {
                email: Some("payer@example.com".to_string()),
            }),
        }
    }

    #[async_trait]
    impl PaymentProcessor for FakeProcessor {
        async fn create_checkout_session(
            &self,
            request: &CheckoutRequest,
        ) -> Result<CheckoutSession, ProcessorError> {
            if self.unavailable {
                return Err(ProcessorError::Decode("processor unavailable".to_string()));
            }
            let mut created = self.created.lock();
            created.push(request.clone());
            let id = format!("cs_test_{}", created.len());
            Ok(CheckoutSession {
                url: Some(format!("https://checkout.example.com/pay/{id}")),
                id,
                payment_status: "unpaid".to_string(),
                metadata: request.metadata.clone(),
                ..CheckoutSession::default()
            })
        }

        async fn retrieve_checkout_session(
            &self,
            id: &str,
        ) -> Result<CheckoutSession, ProcessorError> {
            *self.retrievals.lock() += 1;
            if self.unavailable {
                return Err(ProcessorError::Decode("processor unavailable".to_string()));
            }
            self.sessions
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| ProcessorError::NotFound(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_deserializes_processor_shape() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "payment_status": "paid",
            "amount_total": 1250,
            "payment_intent": "pi_123",
            "customer_email": null,
            "customer_details": { "email": "payer@example.com", "name": "Ana" },
            "metadata": { "loanApplicationId": "app-1", "borrower": "ana@example.com" }
        }))
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.amount_total, Some(1250));
        assert_eq!(session.metadata_value("loanApplicationId"), Some("app-1"));
        assert_eq!(
            session.customer_details.unwrap().email.as_deref(),
            Some("payer@example.com")
        );
    }

    #[test]
    fn test_blank_metadata_is_absent() {
        let mut session = CheckoutSession::default();
        session
            .metadata
            .insert("loanApplicationId".to_string(), "  ".to_string());
        assert_eq!(session.metadata_value("loanApplicationId"), None);
        assert_eq!(session.metadata_value("borrower"), None);
        assert!(!session.is_paid());
    }
}
