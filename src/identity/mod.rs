//! Identity provider surface shared by the client bridge and the server.
//!
//! The client side signs in, keeps the provider session and signs out
//! ([`IdentityProvider`]); the server side only validates access tokens
//! ([`TokenVerifier`]). [`SupabaseClient`] implements both.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

mod supabase;

pub use supabase::SupabaseClient;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The provider answered and refused the credentials or token. The message
    /// is the provider's own and is shown to users as-is.
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Network(String),
    #[error("invalid identity provider response: {0}")]
    Parse(String),
    #[error("identity provider is not configured")]
    Disabled,
}

/// Profile fields the provider keeps next to the account.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserMetadata {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// User as returned by the provider for a valid access token.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProviderUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Provider session held locally by the client. Never persisted by the bridge.
#[derive(Clone, Debug, Default)]
pub struct ProviderSession {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    /// Expiry as unix seconds; `None` means the provider did not say.
    pub expires_at: Option<i64>,
    pub user: Option<ProviderUser>,
}

impl ProviderSession {
    #[must_use]
    pub fn new(access_token: &str) -> Self {
        Self {
            access_token: Some(SecretString::from(access_token.to_string())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: &str) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.to_string()));
        self
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Access token if present and non-blank, regardless of expiry.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token
            .as_ref()
            .map(|token| token.expose_secret().trim())
            .filter(|token| !token.is_empty())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_ref()
            .map(|token| token.expose_secret().trim())
            .filter(|token| !token.is_empty())
    }

    #[must_use]
    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now_unix)
    }

    /// Access token usable right now: present, non-blank and not expired.
    #[must_use]
    pub fn valid_access_token(&self) -> Option<&str> {
        if self.is_expired_at(unix_now()) {
            None
        } else {
            self.access_token()
        }
    }
}

/// Client-side identity provider operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Whether a provider is configured at all.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, IdentityError>;

    /// Current local session, refreshed first when it has expired.
    async fn get_session(&self) -> Result<Option<ProviderSession>, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Server-side access token validation.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_access_token(&self, access_token: &str) -> Result<ProviderUser, IdentityError>;
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
