//! Session check endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::types::SessionResponse;
use crate::api::{
    cookie::{extract_session_token, hash_session_token},
    state::SessionState,
};

#[utoipa::path(
    get,
    path = "/api/admin/session",
    responses(
        (status = 200, description = "Session projection, anonymous when there is no valid session", body = SessionResponse),
        (status = 500, description = "Session storage unavailable")
    ),
    tag = "session"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<SessionState>>) -> impl IntoResponse {
    // A missing or forged cookie is a normal anonymous answer, not an error.
    let Some(token) = extract_session_token(&headers, state.config(), state.signer()) else {
        return (StatusCode::OK, Json(SessionResponse::anonymous())).into_response();
    };

    match state.store().lookup_session(&hash_session_token(&token)).await {
        Ok(Some(record)) => (StatusCode::OK, Json(SessionResponse::from(record))).into_response(),
        Ok(None) => (StatusCode::OK, Json(SessionResponse::anonymous())).into_response(),
        Err(err) => {
            error!("Failed to lookup session: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
