//! Hosted payment gateway integration.
//!
//! Checkout happens on the gateway's hosted page; this service only creates
//! sessions and later reads them back to decide whether a booking exists.

mod stripe;

pub use stripe::StripeGateway;

use anyhow::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::Party;

/// Metadata keys attached to every checkout session
pub mod metadata {
    pub const CLUB_ID: &str = "clubId";
    pub const CUSTOMER_EMAIL: &str = "customerEmail";
    pub const CUSTOMER_NAME: &str = "customerName";
    pub const CUSTOMER_IMAGE: &str = "customerImage";
    pub const SELLER_EMAIL: &str = "sellerEmail";
    pub const SELLER_NAME: &str = "sellerName";
    pub const SELLER_IMAGE: &str = "sellerImage";
    pub const QUANTITY: &str = "quantity";
}

/// Everything needed to open a hosted checkout for one club membership
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub club_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Price per unit in the smallest currency unit
    pub unit_amount: i64,
    pub quantity: i64,
    pub currency: String,
    pub customer: Party,
    pub seller: Party,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            (metadata::CLUB_ID, self.club_id.clone()),
            (metadata::CUSTOMER_EMAIL, self.customer.email.clone()),
            (metadata::CUSTOMER_NAME, opt(&self.customer.name)),
            (metadata::CUSTOMER_IMAGE, opt(&self.customer.image)),
            (metadata::SELLER_EMAIL, self.seller.email.clone()),
            (metadata::SELLER_NAME, opt(&self.seller.name)),
            (metadata::SELLER_IMAGE, opt(&self.seller.image)),
            (metadata::QUANTITY, self.quantity.to_string()),
        ]
    }
}

/// Checkout session as reported by the gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    /// Total charged in the smallest currency unit
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Non-empty metadata value
    pub fn meta(&self, key: &str) -> Option<String> {
        self.metadata
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    /// Amount in major currency units
    pub fn amount(&self) -> f64 {
        self.amount_total.unwrap_or(0) as f64 / 100.0
    }

    /// Units bought, 1 when the session does not say
    pub fn quantity(&self) -> i64 {
        self.meta(metadata::QUANTITY)
            .and_then(|q| q.parse::<i64>().ok())
            .filter(|q| *q > 0)
            .unwrap_or(1)
    }
}

lazy_static! {
    static ref SESSION_ID_REGEX: Regex = Regex::new(r"^cs_[A-Za-z0-9_]+$").unwrap();
}

/// Checkout session ids are `cs_` followed by ASCII word characters.
/// They go into the gateway URL path, so nothing else is accepted.
pub fn is_checkout_session_id(id: &str) -> bool {
    SESSION_ID_REGEX.is_match(id)
}

/// Convert a major-unit price to the smallest currency unit
pub fn to_minor_units(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession>;
}
