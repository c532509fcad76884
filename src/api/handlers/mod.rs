//! API handlers and shared helpers.

pub mod health;
pub mod login;
pub mod logout;
pub mod session;
pub mod types;

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;

use types::ErrorResponse;

/// Normalize an email for admin lookups and session records.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

static EMAIL_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    EMAIL_REGEX
        .as_ref()
        .is_some_and(|regex| regex.is_match(email_normalized))
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
        .into_response()
}
