//! Logout endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::types::SuccessResponse;
use crate::api::{
    cookie::{clear_session_cookie, extract_session_token, hash_session_token},
    state::SessionState,
};

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cleared", body = SuccessResponse)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<SessionState>>) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers, state.config(), state.signer()) {
        if let Err(err) = state.store().delete_session(&hash_session_token(&token)).await {
            error!("Failed to delete session: {err:#}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(state.config()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clearing cookie: {err}"),
    }
    (StatusCode::OK, response_headers, Json(SuccessResponse::ok()))
}
