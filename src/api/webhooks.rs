use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::payments::CheckoutSession;
use crate::AppState;

use super::payments::record_paid_session;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook, in seconds
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a Stripe webhook signature (Stripe-Signature header)
fn verify_stripe_signature(
    secret: &str,
    signature_header: &str,
    payload: &[u8],
    now: i64,
) -> bool {
    // Header format: t=<unix>,v1=<hex>[,v1=<hex>][,v0=<hex>]
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = match timestamp {
        Some(t) => t,
        None => return false,
    };
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    signatures.into_iter().any(|signature| {
        let expected = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        // Use constant-time comparison
        mac.verify_slice(&expected).is_ok()
    })
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    // Verify signature if secret is configured
    if let Some(ref secret) = state.config.payments.webhook_secret {
        let signature = headers
            .get("Stripe-Signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("Stripe webhook missing Stripe-Signature header");
                StatusCode::UNAUTHORIZED
            })?;

        let now = chrono::Utc::now().timestamp();
        if !verify_stripe_signature(secret, signature, &body, now) {
            tracing::warn!("Stripe webhook signature verification failed");
            return Err(StatusCode::UNAUTHORIZED);
        }
        tracing::debug!("Stripe webhook signature verified");
    }

    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Failed to parse Stripe webhook payload: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    if event.event_type != "checkout.session.completed" {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring Stripe event");
        return Ok(StatusCode::OK);
    }

    let session: CheckoutSession = serde_json::from_value(event.data.object).map_err(|e| {
        tracing::error!("Failed to parse checkout session in webhook: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    if !session.is_paid() {
        tracing::info!(session_id = %session.id, status = %session.payment_status, "Checkout completed without payment");
        return Ok(StatusCode::OK);
    }

    match record_paid_session(&state, &session).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) if e.status().is_client_error() => {
            // Acknowledge client errors; only server errors get retried
            tracing::warn!(session_id = %session.id, error = %e, "Webhook session not recorded");
            Ok(StatusCode::OK)
        }
        Err(e) => {
            tracing::error!(session_id = %session.id, error = %e, "Failed to record webhook session");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test", 1700000000, payload));
        assert!(verify_stripe_signature("whsec_test", &header, payload, 1700000010));
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let payload = b"{}";
        let header = format!(
            "t=1700000000,v1={},v1={},v0=deadbeef",
            "00".repeat(32),
            sign("whsec_test", 1700000000, payload)
        );
        assert!(verify_stripe_signature("whsec_test", &header, payload, 1700000000));
    }

    #[test]
    fn test_wrong_secret_or_tampered_payload() {
        let payload = b"{\"amount\":100}";
        let header = format!("t=1700000000,v1={}", sign("whsec_test", 1700000000, payload));
        assert!(!verify_stripe_signature("whsec_other", &header, payload, 1700000000));
        assert!(!verify_stripe_signature("whsec_test", &header, b"{\"amount\":1}", 1700000000));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let header = format!("t=1700000000,v1={}", sign("whsec_test", 1700000000, payload));
        assert!(!verify_stripe_signature(
            "whsec_test",
            &header,
            payload,
            1700000000 + SIGNATURE_TOLERANCE_SECS + 1
        ));
    }

    #[test]
    fn test_malformed_header() {
        assert!(!verify_stripe_signature("s", "", b"{}", 0));
        assert!(!verify_stripe_signature("s", "v1=abcd", b"{}", 0));
        assert!(!verify_stripe_signature("s", "t=abc,v1=zz", b"{}", 0));
    }
}
