//! Exchanges identity provider access tokens for the first-party session
//! cookie, on sign-in and when repairing a missing server session at start-up.

use std::sync::Arc;
use tracing::{debug, warn};

use super::{api::SessionApi, error::AuthError, types::SessionProjection};
use crate::identity::IdentityProvider;

/// Outcome of one start-up reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// The server already has a session; nothing was exchanged.
    AlreadyAuthenticated,
    ProviderDisabled,
    /// The provider holds no usable access token.
    NoProviderSession,
    /// A provider token was exchanged for a server session.
    Exchanged,
    Failed(AuthError),
}

#[derive(Clone)]
pub struct SessionBridge {
    provider: Arc<dyn IdentityProvider>,
    api: Arc<dyn SessionApi>,
}

impl SessionBridge {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, api: Arc<dyn SessionApi>) -> Self {
        Self { provider, api }
    }

    /// Submit `access_token` to the server login endpoint.
    ///
    /// # Errors
    /// `AuthError::Exchange` carries the server's message verbatim.
    pub async fn exchange(&self, access_token: &str) -> Result<(), AuthError> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(AuthError::InvalidArgument(
                "Access token is required".to_string(),
            ));
        }
        self.api.exchange_token(access_token).await
    }

    /// Repair a missing server session from the provider's local session.
    ///
    /// Never fails; failures are reported as [`Reconciliation::Failed`] and
    /// logged here.
    pub async fn reconcile(&self, current: &SessionProjection) -> Reconciliation {
        if current.is_authenticated() {
            return Reconciliation::AlreadyAuthenticated;
        }

        if !self.provider.is_enabled() {
            debug!("Identity provider disabled, skipping reconciliation");
            return Reconciliation::ProviderDisabled;
        }

        let session = match self.provider.get_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!("Failed to read identity provider session: {err}");
                return Reconciliation::Failed(err.into());
            }
        };

        let Some(access_token) = session
            .as_ref()
            .and_then(|session| session.valid_access_token())
        else {
            debug!("No identity provider session to exchange");
            return Reconciliation::NoProviderSession;
        };

        match self.exchange(access_token).await {
            Ok(()) => Reconciliation::Exchanged,
            Err(err) => {
                warn!("Server rejected identity provider session: {err}");
                Reconciliation::Failed(err)
            }
        }
    }
}
