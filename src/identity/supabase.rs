//! Supabase GoTrue client.
//!
//! Flow Overview: password sign-in and refresh go through
//! `/auth/v1/token?grant_type=...`, sign-out through `/auth/v1/logout`, and
//! token validation through `/auth/v1/user`. Every request carries the
//! project's public `apikey`. The provider session lives in memory only.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{IdentityError, IdentityProvider, ProviderSession, ProviderUser, TokenVerifier, unix_now};
use crate::APP_USER_AGENT;

/// Maximum number of error body characters carried into a message.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug)]
struct Endpoint {
    base_url: String,
    anon_key: SecretString,
}

/// Token grant response shared by password and refresh grants.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<ProviderUser>,
}

impl From<TokenResponse> for ProviderSession {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_at
            .or_else(|| response.expires_in.map(|seconds| unix_now() + seconds));
        Self {
            access_token: Some(SecretString::from(response.access_token)),
            refresh_token: response.refresh_token.map(SecretString::from),
            expires_at,
            user: response.user,
        }
    }
}

#[derive(Debug)]
pub struct SupabaseClient {
    endpoint: Option<Endpoint>,
    http: Client,
    session: RwLock<Option<ProviderSession>>,
}

impl SupabaseClient {
    /// Build a client for the project at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: SecretString) -> Result<Self, IdentityError> {
        let parsed = Url::parse(base_url)
            .map_err(|err| IdentityError::Parse(format!("invalid provider URL {base_url}: {err}")))?;
        if parsed.host_str().is_none() {
            return Err(IdentityError::Parse(format!(
                "provider URL must include a host: {base_url}"
            )));
        }

        Ok(Self {
            endpoint: Some(Endpoint {
                base_url: base_url.trim().trim_end_matches('/').to_string(),
                anon_key,
            }),
            http: build_http_client()?,
            session: RwLock::new(None),
        })
    }

    /// A client with no provider behind it. Sign-in fails with
    /// [`IdentityError::Disabled`] and there is never a local session.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn disabled() -> Result<Self, IdentityError> {
        Ok(Self {
            endpoint: None,
            http: build_http_client()?,
            session: RwLock::new(None),
        })
    }

    /// Replace the local session, e.g. after an OAuth redirect.
    pub async fn set_session(&self, session: ProviderSession) {
        *self.session.write().await = Some(session);
    }

    /// Pick up the session the provider placed in the redirect URL fragment
    /// (`#access_token=...&refresh_token=...&expires_in=...`).
    ///
    /// Returns `Ok(false)` when the URL carries no session.
    ///
    /// # Errors
    /// Returns [`IdentityError::Rejected`] when the provider redirected with an error.
    pub async fn restore_from_redirect(&self, redirect: &Url) -> Result<bool, IdentityError> {
        match session_from_redirect(redirect)? {
            Some(session) => {
                self.set_session(session).await;
                info!("Restored provider session from redirect");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn endpoint(&self) -> Result<&Endpoint, IdentityError> {
        self.endpoint.as_ref().ok_or(IdentityError::Disabled)
    }

    fn auth_url(&self, path: &str) -> Result<String, IdentityError> {
        let endpoint = self.endpoint()?;
        Ok(format!(
            "{}/auth/v1/{}",
            endpoint.base_url,
            path.trim_start_matches('/')
        ))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<ProviderSession, IdentityError> {
        let url = self.auth_url(&format!("token?grant_type={grant_type}"))?;
        let endpoint = self.endpoint()?;

        let response = self
            .http
            .post(&url)
            .header("apikey", endpoint.anon_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| IdentityError::Parse(format!("failed to decode token response: {err}")))?;

        Ok(token.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, IdentityError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, IdentityError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;

        self.set_session(session.clone()).await;
        debug!("Provider password sign-in succeeded");

        Ok(session)
    }

    async fn get_session(&self) -> Result<Option<ProviderSession>, IdentityError> {
        let Some(current) = self.session.read().await.clone() else {
            return Ok(None);
        };

        if !current.is_expired_at(unix_now()) {
            return Ok(Some(current));
        }

        let Some(refresh_token) = current.refresh_token().map(ToString::to_string) else {
            *self.session.write().await = None;
            return Ok(None);
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                self.set_session(refreshed.clone()).await;
                debug!("Provider session refreshed");
                Ok(Some(refreshed))
            }
            Err(IdentityError::Rejected(message)) => {
                warn!("Provider refused to refresh session: {message}");
                *self.session.write().await = None;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        // The local session goes first so a failed remote call cannot keep it alive.
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        let Some(access_token) = session.access_token() else {
            return Ok(());
        };

        let url = self.auth_url("logout")?;
        let endpoint = self.endpoint()?;
        let response = self
            .http
            .post(&url)
            .header("apikey", endpoint.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(response).await)
        }
    }
}

#[async_trait]
impl TokenVerifier for SupabaseClient {
    #[instrument(skip_all)]
    async fn verify_access_token(&self, access_token: &str) -> Result<ProviderUser, IdentityError> {
        let url = self.auth_url("user")?;
        let endpoint = self.endpoint()?;

        let response = self
            .http
            .get(&url)
            .header("apikey", endpoint.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(IdentityError::Network(format!("provider returned {status}")));
        }
        if !status.is_success() {
            return Err(rejection(response).await);
        }

        response
            .json::<ProviderUser>()
            .await
            .map_err(|err| IdentityError::Parse(format!("failed to decode user: {err}")))
    }
}

fn build_http_client() -> Result<Client, IdentityError> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .build()
        .map_err(|err| IdentityError::Network(format!("failed to build HTTP client: {err}")))
}

fn map_request_error(err: reqwest::Error) -> IdentityError {
    IdentityError::Network(err.to_string())
}

async fn rejection(response: Response) -> IdentityError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    IdentityError::Rejected(error_message(status, &body))
}

/// Pull a human readable message out of a provider error body.
///
/// GoTrue has used `msg`, `error_description`, `message` and `error` over time.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["msg", "error_description", "message", "error"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                if !message.trim().is_empty() {
                    return message.trim().to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

/// Parse the session the provider appends to the redirect URL fragment.
fn session_from_redirect(redirect: &Url) -> Result<Option<ProviderSession>, IdentityError> {
    let Some(fragment) = redirect.fragment() else {
        return Ok(None);
    };

    let mut access_token = None;
    let mut refresh_token = None;
    let mut expires_in = None;
    let mut expires_at = None;
    let mut error = None;
    let mut error_description = None;

    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" => access_token = Some(value.into_owned()),
            "refresh_token" => refresh_token = Some(value.into_owned()),
            "expires_in" => expires_in = value.parse::<i64>().ok(),
            "expires_at" => expires_at = value.parse::<i64>().ok(),
            "error" => error = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(IdentityError::Rejected(error_description.unwrap_or(error)));
    }

    let Some(access_token) = access_token.filter(|token| !token.trim().is_empty()) else {
        return Ok(None);
    };

    let mut session = ProviderSession::new(&access_token);
    if let Some(refresh_token) = refresh_token {
        session = session.with_refresh_token(&refresh_token);
    }
    if let Some(expires_at) = expires_at.or_else(|| expires_in.map(|seconds| unix_now() + seconds)) {
        session = session.with_expires_at(expires_at);
    }

    Ok(Some(session))
}
