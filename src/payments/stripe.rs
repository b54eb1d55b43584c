//! Stripe Checkout client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{is_checkout_session_id, CheckoutRequest, CheckoutSession, PaymentGateway};
use crate::config::PaymentsConfig;

/// Stripe REST client for Checkout Sessions
pub struct StripeGateway {
    secret_key: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &PaymentsConfig) -> Self {
        if config.stripe_secret_key.is_none() {
            tracing::warn!("payments.stripe_secret_key is not set; checkout will fail");
        }
        Self {
            secret_key: config.stripe_secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .context("Payments are not configured (missing Stripe secret key)")
    }

    async fn parse(response: reqwest::Response) -> Result<CheckoutSession> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            anyhow::bail!("Stripe API error: {} - {}", status, message);
        }

        response
            .json()
            .await
            .context("Failed to parse Stripe API response")
    }
}

/// Form fields for `POST /v1/checkout/sessions`
pub(crate) fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.unit_amount.to_string(),
        ),
        (
            "line_items[0][quantity]".to_string(),
            request.quantity.to_string(),
        ),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    // Stripe rejects empty strings for these
    if let Some(description) = request.description.as_ref().filter(|d| !d.is_empty()) {
        form.push((
            "line_items[0][price_data][product_data][description]".to_string(),
            description.clone(),
        ));
    }
    if let Some(image) = request.image.as_ref().filter(|i| !i.is_empty()) {
        form.push((
            "line_items[0][price_data][product_data][images][0]".to_string(),
            image.clone(),
        ));
    }
    if !request.customer.email.is_empty() {
        form.push(("customer_email".to_string(), request.customer.email.clone()));
    }

    for (key, value) in request.metadata() {
        form.push((format!("metadata[{}]", key), value));
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key()?)
            .form(&checkout_form(request))
            .send()
            .await
            .context("Failed to reach Stripe")?;

        let session = Self::parse(response).await?;
        tracing::info!(session_id = %session.id, club_id = %request.club_id, "Checkout session created");
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        if !is_checkout_session_id(session_id) {
            anyhow::bail!("Malformed checkout session id: {:?}", session_id);
        }
        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(self.secret_key()?)
            .send()
            .await
            .context("Failed to reach Stripe")?;

        Self::parse(response).await
    }
}
