//! Payment API types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::is_valid_id;
use crate::domain::payments::{CheckoutInput, Reconciled};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct Borrower {
    #[validate(email(message = "Borrower email is invalid"))]
    pub email: String,
}

fn validate_application_id(id: &str) -> Result<(), validator::ValidationError> {
    if !is_valid_id(id) {
        return Err(validator::ValidationError::new("loan_application_id")
            .with_message("Invalid loan application id".into()));
    }
    Ok(())
}

/// Body for POST /create-checkout-session
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[validate(length(min = 1, max = 200, message = "Loan title is required"))]
    pub loan_title: String,
    pub amount: f64,
    pub image: Option<String>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: u32,
    #[validate(nested)]
    pub borrower: Borrower,
    #[validate(custom(function = "validate_application_id"))]
    pub loan_application_id: String,
}

fn default_quantity() -> u32 {
    1
}

impl From<CreateCheckoutRequest> for CheckoutInput {
    fn from(req: CreateCheckoutRequest) -> Self {
        Self {
            loan_title: req.loan_title,
            amount: req.amount,
            image: req.image,
            quantity: req.quantity,
            borrower_email: req.borrower.email.trim().to_lowercase(),
            loan_application_id: req.loan_application_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Processor-hosted payment page
    pub url: String,
}

/// Query for GET /payment-success
#[derive(Debug, Deserialize)]
pub struct PaymentSuccessQuery {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessResponse {
    pub success: bool,
    pub message: String,
    pub loan_application_id: String,
    pub stripe_payment_id: String,
}

impl From<Reconciled> for PaymentSuccessResponse {
    fn from(r: Reconciled) -> Self {
        Self {
            success: true,
            message: "Payment successful".to_string(),
            loan_application_id: r.loan_application_id,
            stripe_payment_id: r.stripe_payment_id,
        }
    }
}
