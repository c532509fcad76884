//! Token exchange: provider access token in, signed session cookie out.
//!
//! Flow Overview:
//! 1) Validate the access token with the identity provider.
//! 2) Resolve admin status through the admin directory.
//! 3) Reuse the caller's session token when it already belongs to the same
//!    user, otherwise mint a new one, and store the session.
//! 4) Set the signed cookie.
//!
//! Replaying a still-valid token only refreshes the session, so a start-up
//! reconciliation racing an explicit sign-in is harmless.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{
    error_response, normalize_email,
    types::{ErrorResponse, LoginRequest, SuccessResponse},
};
use crate::api::{
    cookie::{extract_session_token, generate_session_token, hash_session_token, session_cookie},
    state::SessionState,
    store::SessionRecord,
};
use crate::identity::{IdentityError, unix_now};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookie set", body = SuccessResponse),
        (status = 400, description = "Missing access token", body = ErrorResponse),
        (status = 401, description = "Access token rejected by the identity provider", body = ErrorResponse),
        (status = 502, description = "Identity provider unavailable", body = ErrorResponse),
        (status = 503, description = "Identity provider not configured", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<SessionState>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let access_token = payload
        .map(|Json(request)| request.access_token)
        .unwrap_or_default();
    let access_token = access_token.trim();
    if access_token.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Access token is required");
    }

    let user = match state.verifier().verify_access_token(access_token).await {
        Ok(user) => user,
        Err(IdentityError::Rejected(message)) => {
            debug!("Access token rejected: {message}");
            return error_response(StatusCode::UNAUTHORIZED, message);
        }
        Err(IdentityError::Disabled) => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Identity provider is not configured",
            );
        }
        Err(err) => {
            warn!("Failed to validate access token: {err}");
            return error_response(StatusCode::BAD_GATEWAY, "Identity provider unavailable");
        }
    };

    let Some(email) = user
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|email| !email.is_empty())
    else {
        return error_response(StatusCode::UNAUTHORIZED, "Identity has no email address");
    };

    let admin = match state.store().lookup_admin(&email).await {
        Ok(admin) => admin,
        Err(err) => {
            error!("Failed to lookup admin directory: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let (first_name, last_name) = match &admin {
        Some(profile) if profile.first_name.is_some() || profile.last_name.is_some() => {
            (profile.first_name.clone(), profile.last_name.clone())
        }
        _ => (
            user.user_metadata.first_name.clone(),
            user.user_metadata.last_name.clone(),
        ),
    };

    let Some(expires_at_unix) = unix_now().checked_add(state.config().session_ttl_seconds()) else {
        error!(
            ttl = state.config().session_ttl_seconds(),
            "Session expiry overflows"
        );
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let record = SessionRecord {
        user_id: user.id,
        email,
        first_name,
        last_name,
        is_admin: admin.is_some(),
        expires_at_unix,
    };

    let token = match reusable_token(&headers, &state.0, &record).await {
        Some(token) => token,
        None => match generate_session_token() {
            Ok(token) => token,
            Err(err) => {
                error!("Failed to generate session token: {err:#}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
    };

    if let Err(err) = state
        .store()
        .save_session(&hash_session_token(&token), &record)
        .await
    {
        error!("Failed to save session: {err:#}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let cookie = match session_cookie(state.config(), state.signer(), &token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    info!(user_id = %record.user_id, is_admin = record.is_admin, "Session established");

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    (StatusCode::OK, response_headers, Json(SuccessResponse::ok())).into_response()
}

/// Existing session token of the caller when it belongs to the same user.
/// A session of a different user is dropped so the caller cannot hold two.
async fn reusable_token(
    headers: &HeaderMap,
    state: &SessionState,
    record: &SessionRecord,
) -> Option<String> {
    let token = extract_session_token(headers, state.config(), state.signer())?;
    let token_hash = hash_session_token(&token);

    match state.store().lookup_session(&token_hash).await {
        Ok(Some(existing)) if existing.user_id == record.user_id => Some(token),
        Ok(Some(_)) => {
            if let Err(err) = state.store().delete_session(&token_hash).await {
                error!("Failed to delete replaced session: {err:#}");
            }
            None
        }
        Ok(None) => None,
        Err(err) => {
            warn!("Failed to lookup existing session: {err:#}");
            None
        }
    }
}
