//! HTTP access to the tessera session endpoints.
//!
//! Every request goes through one cookie jar, so the `HttpOnly` session cookie
//! set by the login endpoint rides along on the following calls.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    config::ClientConfig,
    error::AuthError,
    types::{ErrorBody, ExchangeRequest, SessionProjection},
};
use crate::APP_USER_AGENT;

const SESSION_PATH: &str = "/api/admin/session";
const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

/// The three session endpoints the client consumes.
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn fetch_session(&self) -> Result<SessionProjection, AuthError>;

    /// Exchange a provider access token for the session cookie.
    async fn exchange_token(&self, access_token: &str) -> Result<(), AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;
}

#[derive(Clone, Debug)]
pub struct HttpSessionApi {
    config: ClientConfig,
    http: Client,
}

impl HttpSessionApi {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        let mut builder = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| AuthError::Network(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn fetch_session(&self) -> Result<SessionProjection, AuthError> {
        let response = self
            .http
            .get(self.config.url(SESSION_PATH))
            .send()
            .await
            .map_err(map_request_error)?;

        handle_json_response(response).await
    }

    async fn exchange_token(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.config.url(LOGIN_PATH))
            .json(&ExchangeRequest { access_token })
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status().is_success() {
            debug!("Token exchange accepted");
            Ok(())
        } else {
            Err(AuthError::Exchange(error_message(response).await))
        }
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.config.url(LOGOUT_PATH))
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AuthError::Network(error_message(response).await))
        }
    }
}

fn map_request_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Network("Request timed out. Please try again.".to_string())
    } else {
        AuthError::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| AuthError::Parse(format!("Failed to decode response: {err}")))
    } else {
        let status = response.status();
        let message = error_message(response).await;
        Err(AuthError::Network(format!("Request failed ({status}): {message}")))
    }
}

/// The server's `{message}` when present, otherwise the sanitized body.
async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    if let Ok(ErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<ErrorBody>(&body)
    {
        if !message.trim().is_empty() {
            return message;
        }
    }
    sanitize_body(&body)
}

/// Trims and truncates error bodies for user-facing messages.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
