//! Client auth state container.
//!
//! The store hydrates once on start-up (`initialize`), repairing a missing
//! server session from the identity provider when it can. After that the
//! state only changes through `check_session`, `sign_in` and `sign_out`.
//! Only non-sensitive profile fields live here; the session itself stays in
//! an `HttpOnly` cookie.

use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{
    api::SessionApi,
    bridge::{Reconciliation, SessionBridge},
    error::AuthError,
    navigator::Navigator,
    types::SessionProjection,
};
use crate::identity::IdentityProvider;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_admin: bool,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// True until the first session check has completed.
    pub loading: bool,
    pub identity_provider_enabled: bool,
}

impl AuthState {
    fn initial(identity_provider_enabled: bool) -> Self {
        Self {
            is_admin: false,
            email: None,
            first_name: None,
            last_name: None,
            loading: true,
            identity_provider_enabled,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.email.is_some()
    }

    #[must_use]
    pub fn projection(&self) -> SessionProjection {
        SessionProjection {
            is_admin: self.is_admin,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    fn apply(&mut self, projection: SessionProjection) {
        let projection = projection.sanitized();
        self.is_admin = projection.is_admin;
        self.email = projection.email;
        self.first_name = projection.first_name;
        self.last_name = projection.last_name;
        self.loading = false;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

pub struct AuthStore {
    state: watch::Sender<AuthState>,
    provider: Arc<dyn IdentityProvider>,
    api: Arc<dyn SessionApi>,
    bridge: SessionBridge,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    started: AtomicBool,
}

impl AuthStore {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        api: Arc<dyn SessionApi>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::initial(provider.is_enabled()));
        let bridge = SessionBridge::new(provider.clone(), api.clone());
        Self {
            state,
            provider,
            api,
            bridge,
            navigator,
            login_path: login_path.into(),
            started: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        let state = self.state.borrow();
        if state.loading {
            if self.started.load(Ordering::SeqCst) {
                AuthPhase::Loading
            } else {
                AuthPhase::Uninitialized
            }
        } else if state.is_authenticated() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }

    /// Read the server session into local state.
    ///
    /// Any failure resets local state to anonymous and yields `None`.
    pub async fn check_session(&self) -> Option<SessionProjection> {
        match self.api.fetch_session().await {
            Ok(projection) => {
                let projection = projection.sanitized();
                self.publish(projection.clone());
                Some(projection)
            }
            Err(err) => {
                warn!("Session check failed: {err}");
                self.publish(SessionProjection::anonymous());
                None
            }
        }
    }

    /// Hydrate once; later calls return the current state untouched.
    pub async fn initialize(&self) -> AuthState {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.snapshot();
        }

        let current = self.check_session().await.unwrap_or_default();
        match self.bridge.reconcile(&current).await {
            Reconciliation::Exchanged => {
                info!("Recovered server session from identity provider session");
                self.check_session().await;
            }
            outcome => debug!("Reconciliation finished: {outcome:?}"),
        }

        self.snapshot()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    /// `InvalidArgument` when either credential is missing, `Provider` when
    /// the identity provider refuses them and `Exchange` when the server
    /// refuses the resulting token. Local state is untouched on error.
    pub async fn sign_in(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<AuthState, AuthError> {
        let email = email.map(str::trim).filter(|email| !email.is_empty());
        let password = password.filter(|password| !password.trim().is_empty());
        let (Some(email), Some(password)) = (email, password) else {
            return Err(AuthError::InvalidArgument(
                "Email and password are required".to_string(),
            ));
        };

        let session = self.provider.sign_in_with_password(email, password).await?;
        let access_token = session.access_token().ok_or_else(|| {
            AuthError::Provider("Identity provider returned no access token".to_string())
        })?;

        self.bridge.exchange(access_token).await?;
        self.check_session().await;

        Ok(self.snapshot())
    }

    /// Sign out everywhere and go to the login page. Never fails.
    pub async fn sign_out(&self) {
        if let Err(err) = self.provider.sign_out().await {
            warn!("Identity provider sign-out failed: {err}");
        }
        if let Err(err) = self.api.logout().await {
            warn!("Server logout failed: {err}");
        }

        self.publish(SessionProjection::anonymous());
        self.navigator.navigate(&self.login_path);
    }

    fn publish(&self, projection: SessionProjection) {
        self.state.send_modify(|state| state.apply(projection));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        navigator::MemoryNavigator,
        test_support::{Journal, MockApi, MockProvider, admin},
    };
    use crate::identity::ProviderSession;

    fn store(
        provider: &Arc<MockProvider>,
        api: &Arc<MockApi>,
        navigator: &Arc<MemoryNavigator>,
    ) -> AuthStore {
        AuthStore::new(provider.clone(), api.clone(), navigator.clone(), "/login")
    }

    fn anonymous_ready(enabled: bool) -> AuthState {
        AuthState {
            loading: false,
            ..AuthState::initial(enabled)
        }
    }

    #[tokio::test]
    async fn starts_uninitialized_and_loading() {
        let store = store(
            &Arc::new(MockProvider::empty()),
            &Arc::new(MockApi::anonymous()),
            &Arc::new(MemoryNavigator::new()),
        );
        assert_eq!(store.phase(), AuthPhase::Uninitialized);
        assert!(store.snapshot().loading);
        assert!(store.snapshot().identity_provider_enabled);
    }

    #[tokio::test]
    async fn failed_check_session_is_anonymous_and_ready() {
        let api = Arc::new(MockApi::authenticated("a@b.com"));
        let store = store(
            &Arc::new(MockProvider::empty()),
            &api,
            &Arc::new(MemoryNavigator::new()),
        );
        assert!(store.check_session().await.is_some());
        assert!(store.snapshot().is_admin);

        api.set_offline(true);
        assert_eq!(store.check_session().await, None);
        assert_eq!(store.snapshot(), anonymous_ready(true));
        assert_eq!(store.phase(), AuthPhase::Anonymous);
    }

    #[tokio::test]
    async fn sign_in_without_password_makes_no_call() {
        let provider = Arc::new(MockProvider::empty());
        let api = Arc::new(MockApi::anonymous());
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));
        let before = store.snapshot();

        for (email, password) in [
            (Some("a@b.com"), None),
            (Some("a@b.com"), Some("  ")),
            (None, Some("pw")),
            (Some(" "), Some("pw")),
        ] {
            assert!(matches!(
                store.sign_in(email, password).await,
                Err(AuthError::InvalidArgument(_))
            ));
        }

        assert_eq!(provider.sign_in_calls(), 0);
        assert_eq!(api.exchange_calls(), 0);
        assert_eq!(api.fetch_calls(), 0);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn sign_in_reports_server_projection() -> anyhow::Result<()> {
        let provider = Arc::new(MockProvider::empty().with_password("a@b.com", "pw", "tok123"));
        let api = Arc::new(MockApi::accepting("tok123", "a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));
        let mut updates = store.subscribe();

        let state = store.sign_in(Some("a@b.com"), Some("pw")).await?;

        assert_eq!(api.exchanged_tokens(), vec!["tok123"]);
        let reported = store.check_session().await;
        assert_eq!(Some(state.projection()), reported);
        assert_eq!(state.projection(), admin("a@b.com"));
        assert!(!state.loading);
        assert!(updates.has_changed()?);
        assert_eq!(*updates.borrow_and_update(), state);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_surfaces_provider_message() {
        let provider = Arc::new(MockProvider::empty().with_password("a@b.com", "pw", "tok123"));
        let api = Arc::new(MockApi::accepting("tok123", "a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));
        let before = store.snapshot();

        let result = store.sign_in(Some("a@b.com"), Some("wrong")).await;

        assert_eq!(
            result,
            Err(AuthError::Provider("Invalid credentials".to_string()))
        );
        assert_eq!(api.exchange_calls(), 0);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn rejected_exchange_surfaces_server_message() {
        let provider = Arc::new(MockProvider::empty().with_password("a@b.com", "pw", "tok123"));
        let api = Arc::new(MockApi::accepting("other", "a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let result = store.sign_in(Some("a@b.com"), Some("pw")).await;

        assert_eq!(result, Err(AuthError::Exchange("Invalid token".to_string())));
        assert!(store.snapshot().loading);
    }

    #[tokio::test]
    async fn repeated_exchange_keeps_same_state() -> anyhow::Result<()> {
        let provider = Arc::new(MockProvider::empty().with_password("a@b.com", "pw", "tok123"));
        let api = Arc::new(MockApi::accepting("tok123", "a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let first = store.sign_in(Some("a@b.com"), Some("pw")).await?;
        let second = store.sign_in(Some("a@b.com"), Some("pw")).await?;

        assert_eq!(first, second);
        assert_eq!(api.exchange_calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_clears_and_navigates_even_when_provider_fails() {
        let journal = Journal::default();
        let provider = Arc::new(
            MockProvider::with_session(ProviderSession::new("tok123"))
                .failing_sign_out()
                .with_journal(journal.clone()),
        );
        let api = Arc::new(
            MockApi::authenticated("a@b.com")
                .failing_logout()
                .with_journal(journal.clone()),
        );
        let navigator = Arc::new(MemoryNavigator::new());
        let store = store(&provider, &api, &navigator);
        store.check_session().await;
        assert!(store.snapshot().is_authenticated());

        store.sign_out().await;

        assert_eq!(store.snapshot(), anonymous_ready(true));
        assert_eq!(navigator.last().as_deref(), Some("/login"));
        let events = journal.lock().map(|e| e.clone()).unwrap_or_default();
        assert_eq!(events, vec!["provider.sign_out", "server.logout"]);
    }

    #[tokio::test]
    async fn initialize_with_server_session_skips_exchange() {
        let provider = Arc::new(MockProvider::with_session(ProviderSession::new("tok123")));
        let api = Arc::new(MockApi::authenticated("a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let state = store.initialize().await;

        assert_eq!(state.projection(), admin("a@b.com"));
        assert_eq!(api.exchange_calls(), 0);
        assert_eq!(provider.get_session_calls(), 0);
        assert_eq!(store.phase(), AuthPhase::Authenticated);
    }

    #[tokio::test]
    async fn initialize_without_provider_session_is_anonymous() {
        let provider = Arc::new(MockProvider::empty());
        let api = Arc::new(MockApi::anonymous());
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let state = store.initialize().await;

        assert_eq!(state, anonymous_ready(true));
        assert_eq!(api.exchange_calls(), 0);
        assert_eq!(store.phase(), AuthPhase::Anonymous);
    }

    #[tokio::test]
    async fn initialize_repairs_missing_server_session() {
        let provider = Arc::new(MockProvider::with_session(ProviderSession::new("tok123")));
        let api = Arc::new(MockApi::accepting("tok123", "a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let state = store.initialize().await;

        assert_eq!(state.projection(), admin("a@b.com"));
        assert_eq!(api.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn initialize_swallows_rejected_provider_token() {
        let provider = Arc::new(MockProvider::with_session(ProviderSession::new("stale")));
        let api = Arc::new(MockApi::accepting("tok123", "a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let state = store.initialize().await;

        assert_eq!(state, anonymous_ready(true));
        assert!(provider.has_session());
    }

    #[tokio::test]
    async fn initialize_swallows_provider_session_error() {
        let provider = Arc::new(
            MockProvider::with_session(ProviderSession::new("tok123")).failing_get_session(),
        );
        let api = Arc::new(MockApi::accepting("tok123", "a@b.com"));
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let state = store.initialize().await;

        assert_eq!(state, anonymous_ready(true));
        assert_eq!(provider.get_session_calls(), 1);
        assert_eq!(api.exchange_calls(), 0);
        assert_eq!(store.phase(), AuthPhase::Anonymous);
    }

    #[tokio::test]
    async fn initialize_runs_once() {
        let provider = Arc::new(MockProvider::empty());
        let api = Arc::new(MockApi::anonymous());
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        store.initialize().await;
        store.initialize().await;

        assert_eq!(api.fetch_calls(), 1);
        assert_eq!(provider.get_session_calls(), 1);
    }

    #[tokio::test]
    async fn offline_server_initializes_anonymous() {
        let provider = Arc::new(MockProvider::disabled());
        let api = Arc::new(MockApi::offline());
        let store = store(&provider, &api, &Arc::new(MemoryNavigator::new()));

        let state = store.initialize().await;

        assert_eq!(state, anonymous_ready(false));
    }
}
