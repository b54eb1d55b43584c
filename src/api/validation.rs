//! Input validation for API requests.
//!
//! Each function checks one field and returns a user-facing message on
//! failure. Collect them into an `ApiError` with `ValidationErrorBuilder`
//! from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{format_timestamp, parse_timestamp, Role};

lazy_static! {
    /// One `@`, no whitespace, a dot in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();

    /// Absolute http(s) URL for images
    static ref IMAGE_URL_REGEX: Regex = Regex::new(
        r"^https?://[^\s]+$"
    ).unwrap();
}

const MAX_DESCRIPTION_LENGTH: usize = 5000;

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate a club name (2-120 characters)
pub fn validate_club_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err("Club name is required".to_string());
    }
    if len < 2 {
        return Err("Club name must be at least 2 characters".to_string());
    }
    if len > 120 {
        return Err("Club name is too long (max 120 characters)".to_string());
    }
    Ok(())
}

pub fn validate_category(category: &str) -> Result<(), String> {
    if category.trim().is_empty() {
        return Err("Category is required".to_string());
    }
    if category.len() > 60 {
        return Err("Category is too long (max 60 characters)".to_string());
    }
    Ok(())
}

/// Validate a price or fee (finite, non-negative)
pub fn validate_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err("Price must be a number".to_string());
    }
    if price < 0.0 {
        return Err("Price cannot be negative".to_string());
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description is too long (max {} characters)",
            MAX_DESCRIPTION_LENGTH
        ));
    }
    Ok(())
}

/// Validate an optional image URL. Empty strings clear the image.
pub fn validate_image_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Ok(());
    }
    if url.len() > 2048 {
        return Err("Image URL is too long (max 2048 characters)".to_string());
    }
    if !IMAGE_URL_REGEX.is_match(url) {
        return Err("Image must be an http(s) URL".to_string());
    }
    Ok(())
}

/// Validate an event title (2-200 characters)
pub fn validate_event_title(title: &str) -> Result<(), String> {
    let len = title.trim().chars().count();
    if len == 0 {
        return Err("Event title is required".to_string());
    }
    if len < 2 {
        return Err("Event title must be at least 2 characters".to_string());
    }
    if len > 200 {
        return Err("Event title is too long (max 200 characters)".to_string());
    }
    Ok(())
}

/// Validate an event date and return it in storage format
pub fn validate_event_date(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("Event date is required".to_string());
    }
    parse_timestamp(value)
        .map(format_timestamp)
        .ok_or_else(|| "Invalid event date. Use RFC 3339 or YYYY-MM-DD".to_string())
}

/// Validate the fee against the paid flag
pub fn validate_event_fee(is_paid: bool, fee: f64) -> Result<(), String> {
    validate_price(fee).map_err(|_| "Event fee cannot be negative".to_string())?;
    if is_paid && fee <= 0.0 {
        return Err("Paid events need a fee greater than 0".to_string());
    }
    if !is_paid && fee > 0.0 {
        return Err("Free events cannot carry a fee".to_string());
    }
    Ok(())
}

pub fn validate_max_attendees(max: i64) -> Result<(), String> {
    if max < 1 {
        return Err("Max attendees must be at least 1".to_string());
    }
    Ok(())
}

/// Validate a role name
pub fn validate_role(role: &str) -> Result<Role, String> {
    match role {
        "member" | "manager" | "admin" => role.parse::<Role>(),
        _ => Err("Invalid role. Must be one of: member, manager, admin".to_string()),
    }
}
