//! Stripe Checkout client
//!
//! Talks to the Stripe REST API directly: form-encoded requests, bearer auth,
//! JSON responses. The base URL is configurable so tests can point it at a mock.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::processor::{CheckoutRequest, CheckoutSession, PaymentProcessor, ProcessorError};
use crate::core::config::StripeConfig;
use crate::core::constants::{APP_NAME, HTTP_CLIENT_TIMEOUT_SECS};

const CHECKOUT_SESSIONS_PATH: &str = "/v1/checkout/sessions";

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

pub struct StripeClient {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, ProcessorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
            .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
            .build()?;

        if config.secret_key.is_empty() {
            tracing::warn!("Stripe secret key not configured; checkout calls will be rejected");
        }

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn sessions_url(&self) -> String {
        format!("{}{}", self.api_base, CHECKOUT_SESSIONS_PATH)
    }

    async fn read_session(response: reqwest::Response) -> Result<CheckoutSession, ProcessorError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<CheckoutSession>()
                .await
                .map_err(|e| ProcessorError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .map(|b| match (b.error.kind, b.error.message) {
                (Some(kind), Some(msg)) => format!("{kind}: {msg}"),
                (None, Some(msg)) => msg,
                (Some(kind), None) => kind,
                (None, None) => String::new(),
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        Err(ProcessorError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Stripe form encoding for a single-line-item payment session
fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let item = "line_items[0]";
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        (
            format!("{item}[price_data][currency]"),
            request.currency.clone(),
        ),
        (
            format!("{item}[price_data][product_data][name]"),
            request.product_name.clone(),
        ),
        (
            format!("{item}[price_data][product_data][description]"),
            request.description.clone(),
        ),
        (
            format!("{item}[price_data][unit_amount]"),
            request.unit_amount.to_string(),
        ),
        (format!("{item}[quantity]"), request.quantity.to_string()),
        ("customer_email".to_string(), request.customer_email.clone()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    if let Some(image) = &request.image {
        form.push((
            format!("{item}[price_data][product_data][images][0]"),
            image.clone(),
        ));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        let response = self
            .http_client
            .post(self.sessions_url())
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(request))
            .send()
            .await?;

        let session = Self::read_session(response).await?;
        tracing::debug!(session_id = %session.id, "Stripe checkout session created");
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        id: &str,
    ) -> Result<CheckoutSession, ProcessorError> {
        let response = self
            .http_client
            .get(format!("{}/{}", self.sessions_url(), id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProcessorError::NotFound(id.to_string()));
        }
        Self::read_session(response).await
    }
}
