//! Session configuration and shared handler state.

use std::sync::Arc;

use super::{cookie::CookieSigner, store::SessionStore};
use crate::identity::TokenVerifier;

pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
/// Upper bound accepted from configuration: one year.
pub const MAX_SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;
const DEFAULT_COOKIE_NAME: &str = "tessera_session";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    cookie_name: String,
}

impl SessionConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything the session handlers need, shared behind an `Arc`.
pub struct SessionState {
    config: SessionConfig,
    signer: CookieSigner,
    store: Arc<dyn SessionStore>,
    verifier: Arc<dyn TokenVerifier>,
}

impl SessionState {
    #[must_use]
    pub fn new(
        config: SessionConfig,
        signer: CookieSigner,
        store: Arc<dyn SessionStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            config,
            signer,
            store,
            verifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn signer(&self) -> &CookieSigner {
        &self.signer
    }

    pub(crate) fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub(crate) fn verifier(&self) -> &dyn TokenVerifier {
        self.verifier.as_ref()
    }
}
