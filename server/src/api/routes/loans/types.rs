//! Loan API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::data::types::{LoanRow, LoanUpdate, NewLoan};

/// Loan DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanDto {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LoanRow> for LoanDto {
    fn from(row: LoanRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            image: row.image,
            interest_rate: row.interest_rate,
            max_loan_limit: row.max_loan_limit,
            required_documents: row.required_documents,
            emi_plans: row.emi_plans,
            show_on_home: row.show_on_home,
            created_by: row.created_by,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

fn validate_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        return Err(ValidationError::new("interest_rate")
            .with_message("Interest rate must be between 0 and 100".into()));
    }
    Ok(())
}

fn validate_limit_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::new("max_loan_limit")
            .with_message("Max loan limit must be a positive number".into()));
    }
    Ok(())
}

/// Request body for creating a loan
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: String,
    pub image: Option<String>,
    #[validate(custom(function = "validate_rate"))]
    pub interest_rate: f64,
    #[validate(custom(function = "validate_limit_amount"))]
    pub max_loan_limit: f64,
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub emi_plans: Vec<String>,
    #[serde(default)]
    pub show_on_home: bool,
}

impl CreateLoanRequest {
    pub fn into_new_loan(self, created_by: &str) -> NewLoan {
        NewLoan {
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            image: self.image,
            interest_rate: self.interest_rate,
            max_loan_limit: self.max_loan_limit,
            required_documents: self.required_documents,
            emi_plans: self.emi_plans,
            show_on_home: self.show_on_home,
            created_by: created_by.to_string(),
        }
    }
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoanRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: Option<String>,
    pub image: Option<String>,
    #[validate(custom(function = "validate_rate"))]
    pub interest_rate: Option<f64>,
    #[validate(custom(function = "validate_limit_amount"))]
    pub max_loan_limit: Option<f64>,
    pub required_documents: Option<Vec<String>>,
    pub emi_plans: Option<Vec<String>>,
    pub show_on_home: Option<bool>,
}

impl From<UpdateLoanRequest> for LoanUpdate {
    fn from(req: UpdateLoanRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            category: req.category,
            image: req.image,
            interest_rate: req.interest_rate,
            max_loan_limit: req.max_loan_limit,
            required_documents: req.required_documents,
            emi_plans: req.emi_plans,
            show_on_home: req.show_on_home,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_camel_case() {
        let request: CreateLoanRequest = serde_json::from_str(
            r#"{"title": "Micro", "category": "small", "interestRate": 4.5,
                "maxLoanLimit": 1000, "emiPlans": ["3 months"]}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        let loan = request.into_new_loan("m@example.com");
        assert_eq!(loan.emi_plans, vec!["3 months".to_string()]);
        assert_eq!(loan.created_by, "m@example.com");
        assert!(!loan.show_on_home);
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let request: CreateLoanRequest = serde_json::from_str(
            r#"{"title": "Micro", "category": "small", "interestRate": 140, "maxLoanLimit": 0}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("interest_rate"));
        assert!(errors.field_errors().contains_key("max_loan_limit"));
    }

    #[test]
    fn test_empty_update_maps_to_empty() {
        let request: UpdateLoanRequest = serde_json::from_str("{}").unwrap();
        assert!(LoanUpdate::from(request).is_empty());
    }
}
