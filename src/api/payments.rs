//! Hosted checkout for paid clubs and payment verification.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{Booking, BookingResponse, BookingStatus, NewBooking, Party};
use crate::payments::{
    is_checkout_session_id, metadata, to_minor_units, CheckoutRequest, CheckoutSession,
};
use crate::AppState;

use super::clubs::load_club;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::validate_email;

const MAX_QUANTITY: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub club_id: String,
    pub quantity: Option<i64>,
    #[serde(default)]
    pub customer: Party,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub booking_id: Option<String>,
    pub transaction_id: Option<String>,
    /// True when an earlier verification already created the booking
    pub already_recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingResponse>,
}

fn validate_checkout_request(req: &CreateCheckoutRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if req.club_id.trim().is_empty() {
        errors.add("clubId", "Club id is required");
    }
    errors.check("customer.email", validate_email(&req.customer.email));
    if let Some(quantity) = req.quantity {
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            errors.add(
                "quantity",
                format!("Quantity must be between 1 and {}", MAX_QUANTITY),
            );
        }
    }

    errors.finish()
}

/// Open a hosted checkout session for a paid club
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<CreateCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    req.customer.email = req.customer.email.trim().to_lowercase();
    validate_checkout_request(&req)?;

    let club = load_club(&state.db, req.club_id.trim()).await?;
    if club.is_free() {
        return Err(ApiError::validation_field(
            "clubId",
            "This club is free. Join it directly instead",
        ));
    }

    let client = state.config.server.client_domain.trim_end_matches('/');
    let request = CheckoutRequest {
        club_id: club.id.clone(),
        product_name: club.name.clone(),
        description: Some(club.description.clone()),
        image: club.image.clone(),
        unit_amount: to_minor_units(club.price),
        quantity: req.quantity.unwrap_or(1),
        currency: state.config.payments.currency.clone(),
        customer: req.customer,
        seller: club.seller(),
        success_url: format!(
            "{}/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            client
        ),
        cancel_url: format!("{}/club/{}", client, club.id),
    };

    let session = state
        .payments
        .create_checkout_session(&request)
        .await
        .map_err(|e| {
            tracing::error!(club_id = %club.id, error = %e, "Failed to create checkout session");
            ApiError::upstream("Failed to create checkout session", e)
        })?;

    Ok(Json(CheckoutResponse {
        url: session.url,
        session_id: session.id,
    }))
}

/// Turn a paid session into exactly one booking.
///
/// Returns the booking and whether this call created it.
pub(crate) async fn record_paid_session(
    state: &AppState,
    session: &CheckoutSession,
) -> Result<(Booking, bool), ApiError> {
    if let Some(existing) = Booking::find_by_session(&state.db, &session.id).await? {
        return Ok((existing, false));
    }

    let club_id = session
        .meta(metadata::CLUB_ID)
        .ok_or_else(|| ApiError::bad_request("Payment session carries no club id"))?;
    let club = load_club(&state.db, &club_id).await?;

    let customer_email = session
        .meta(metadata::CUSTOMER_EMAIL)
        .or_else(|| session.customer_email.clone())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| ApiError::bad_request("Payment session carries no customer email"))?;

    let seller = match session.meta(metadata::SELLER_EMAIL) {
        Some(email) => Party {
            email,
            name: session.meta(metadata::SELLER_NAME),
            image: session.meta(metadata::SELLER_IMAGE),
        },
        None => club.seller(),
    };

    let quantity = session.quantity();
    let booking = NewBooking {
        session_id: None,
        club_id: club.id.clone(),
        transaction_id: session.payment_intent.clone(),
        customer: Party {
            email: customer_email,
            name: session.meta(metadata::CUSTOMER_NAME),
            image: session.meta(metadata::CUSTOMER_IMAGE),
        },
        seller,
        club_name: club.name.clone(),
        category: Some(club.category.clone()),
        image: club.image.clone(),
        status: BookingStatus::Confirmed,
        price: session.amount() / quantity as f64,
        quantity,
    };

    let (booking, created) = booking.insert_for_session(&state.db, &session.id).await?;
    if created {
        tracing::info!(
            booking_id = %booking.id,
            session_id = %session.id,
            club_id = %booking.club_id,
            customer = %booking.customer_email,
            "Booking created from payment"
        );
    }

    Ok((booking, created))
}

/// Check a checkout session and record its booking once paid
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    if session_id.trim().is_empty() {
        return Err(ApiError::validation_field("sessionId", "Session id is required"));
    }
    if !is_checkout_session_id(&session_id) {
        return Err(ApiError::validation_field("sessionId", "Malformed checkout session id"));
    }

    let session = state
        .payments
        .retrieve_checkout_session(&session_id)
        .await
        .map_err(|e| {
            tracing::error!(session_id = %session_id, error = %e, "Failed to retrieve checkout session");
            ApiError::upstream("Failed to verify payment", e)
        })?;

    if !session.is_paid() {
        tracing::debug!(session_id = %session_id, status = %session.payment_status, "Payment not completed");
        return Ok(Json(VerifyPaymentResponse {
            success: false,
            message: "Payment not completed".to_string(),
            booking_id: None,
            transaction_id: None,
            already_recorded: false,
            booking: None,
        }));
    }

    let (booking, created) = record_paid_session(&state, &session).await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message: if created {
            "Payment verified and booking created".to_string()
        } else {
            "Payment already recorded".to_string()
        },
        booking_id: Some(booking.id.clone()),
        transaction_id: booking.transaction_id.clone(),
        already_recorded: !created,
        booking: Some(booking.into()),
    }))
}
