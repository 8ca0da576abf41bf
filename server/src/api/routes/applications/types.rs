//! Loan application API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::data::types::{ApplicationRow, ApplicationStatus, FeeStatus};

/// Loan application DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDto {
    pub id: String,
    pub loan_id: String,
    pub loan_title: String,
    pub user_email: String,
    pub loan_amount: f64,
    pub status: ApplicationStatus,
    pub application_fee_status: FeeStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub stripe_payment_id: Option<String>,
    pub payment_email: Option<String>,
    pub payment_amount: Option<f64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<ApplicationRow> for ApplicationDto {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id,
            loan_id: row.loan_id,
            loan_title: row.loan_title,
            user_email: row.user_email,
            loan_amount: row.loan_amount,
            status: row.status,
            application_fee_status: row.application_fee_status,
            approved_at: row.approved_at.and_then(|t| DateTime::from_timestamp(t, 0)),
            stripe_payment_id: row.stripe_payment_id,
            payment_email: row.payment_email,
            payment_amount: row.payment_amount,
            paid_at: row.paid_at.and_then(|t| DateTime::from_timestamp(t, 0)),
            details: row.details,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::new("loan_amount")
            .with_message("Loan amount must be a positive number".into()));
    }
    Ok(())
}

/// Applicant particulars stored alongside the application
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDetails {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 40))]
    pub contact_number: Option<String>,
    #[validate(length(max = 60))]
    pub national_id: Option<String>,
    #[validate(length(max = 200))]
    pub income_source: Option<String>,
    pub monthly_income: Option<f64>,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 2000))]
    pub extra_notes: Option<String>,
}

/// Request body for POST /loans/application
///
/// Applicant email, status and fee state are never read from the body.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    #[validate(length(min = 1, max = 256, message = "Loan id is required"))]
    pub loan_id: String,
    #[validate(custom(function = "validate_amount"))]
    pub loan_amount: f64,
    #[serde(flatten)]
    #[validate(nested)]
    pub details: ApplicantDetails,
}

/// Body for PATCH /update-status/{id}
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_ignores_client_state() {
        let request: CreateApplicationRequest = serde_json::from_str(
            r#"{"loanId": "loan1", "loanAmount": 500, "firstName": "Ana",
                "status": "Approved", "applicationFeeStatus": "Paid",
                "userEmail": "someone@else.com"}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.details.first_name.as_deref(), Some("Ana"));

        let details = serde_json::to_value(&request.details).unwrap();
        assert_eq!(details["firstName"], "Ana");
        assert!(details.get("status").is_none());
    }

    #[test]
    fn test_status_values_are_capitalized() {
        let body: UpdateStatusRequest = serde_json::from_str(r#"{"status": "Approved"}"#).unwrap();
        assert_eq!(body.status, ApplicationStatus::Approved);
        assert!(serde_json::from_str::<UpdateStatusRequest>(r#"{"status": "approved"}"#).is_err());
    }
}
