use anyhow::{Context, Result, ensure};
use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc};
use tessera::{
    api::{
        self, SessionConfig, SessionState,
        cookie::CookieSigner,
        store::{AdminProfile, MemorySessionStore},
    },
    client::{
        AuthError, AuthPhase, AuthStore, ClientConfig, HttpSessionApi, MemoryNavigator, SessionApi,
    },
    identity::{IdentityProvider, ProviderSession, SupabaseClient},
};
use tokio::net::TcpListener;
use url::Url;

const ADMIN_EMAIL: &str = "a@b.com";
const PASSWORD: &str = "correct horse";
const ACCESS_TOKEN: &str = "tok123";
const REFRESH_TOKEN: &str = "ref456";
const USER_ID: &str = "6f1c1f3e-2a53-4f4e-9a59-3f2d0c8c1b11";
const COOKIE_SECRET: &str = "0123456789abcdef0123456789abcdef";

#[derive(Debug, Deserialize)]
struct GrantQuery {
    grant_type: String,
}

fn provider_error(status: StatusCode, description: &str) -> Response {
    (
        status,
        Json(json!({ "error": "invalid_grant", "error_description": description })),
    )
        .into_response()
}

async fn fake_token(Query(query): Query<GrantQuery>, Json(body): Json<Value>) -> Response {
    match query.grant_type.as_str() {
        "password" => {
            let email = body.get("email").and_then(Value::as_str);
            let password = body.get("password").and_then(Value::as_str);
            if email != Some(ADMIN_EMAIL) || password != Some(PASSWORD) {
                return provider_error(StatusCode::BAD_REQUEST, "Invalid credentials");
            }
        }
        "refresh_token" => {
            if body.get("refresh_token").and_then(Value::as_str) != Some(REFRESH_TOKEN) {
                return provider_error(StatusCode::BAD_REQUEST, "Invalid Refresh Token");
            }
        }
        _ => return provider_error(StatusCode::BAD_REQUEST, "Unsupported grant type"),
    }
    Json(json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": REFRESH_TOKEN,
        "user": fake_user_body(),
    }))
    .into_response()
}

fn fake_user_body() -> Value {
    json!({
        "id": USER_ID,
        "email": ADMIN_EMAIL,
        "user_metadata": { "first_name": "Ada", "last_name": "Lovelace" },
    })
}

async fn fake_user(headers: HeaderMap) -> Response {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if bearer == Some(ACCESS_TOKEN) {
        Json(fake_user_body()).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": 401, "msg": "Invalid JWT" })),
        )
            .into_response()
    }
}

async fn fake_logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn serve(app: Router) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    Ok(addr)
}

struct Harness {
    provider: Arc<SupabaseClient>,
    api: Arc<HttpSessionApi>,
    navigator: Arc<MemoryNavigator>,
    store: AuthStore,
}

impl Harness {
    /// Fake identity provider plus a tessera server backed by the memory store.
    async fn start() -> Result<Self> {
        let identity = serve(
            Router::new()
                .route("/auth/v1/token", post(fake_token))
                .route("/auth/v1/user", get(fake_user))
                .route("/auth/v1/logout", post(fake_logout)),
        )
        .await?;
        let identity_url = format!("http://{identity}");
        let anon_key = || SecretString::from("anon-key".to_string());

        let sessions = MemorySessionStore::new().with_admins([AdminProfile {
            email: ADMIN_EMAIL.to_string(),
            first_name: None,
            last_name: None,
        }]);
        let state = SessionState::new(
            SessionConfig::new("http://localhost:3000".to_string()),
            CookieSigner::new(&SecretString::from(COOKIE_SECRET.to_string()))?,
            Arc::new(sessions),
            Arc::new(SupabaseClient::new(&identity_url, anon_key())?),
        );
        let server = serve(api::router(Arc::new(state))).await?;

        let provider = Arc::new(SupabaseClient::new(&identity_url, anon_key())?);
        let api = Arc::new(HttpSessionApi::new(ClientConfig::new(format!(
            "http://{server}"
        )))?);
        let navigator = Arc::new(MemoryNavigator::new());
        let store = AuthStore::new(provider.clone(), api.clone(), navigator.clone(), "/login");

        Ok(Self {
            provider,
            api,
            navigator,
            store,
        })
    }
}

#[tokio::test]
async fn fresh_load_is_anonymous() -> Result<()> {
    let harness = Harness::start().await?;

    let state = harness.store.initialize().await;

    ensure!(!state.loading, "state still loading: {state:?}");
    ensure!(!state.is_admin && state.email.is_none(), "unexpected state: {state:?}");
    ensure!(state.identity_provider_enabled);
    ensure!(harness.store.phase() == AuthPhase::Anonymous);
    Ok(())
}

#[tokio::test]
async fn oauth_redirect_session_is_exchanged_on_start() -> Result<()> {
    let harness = Harness::start().await?;
    let redirect = Url::parse(
        "http://localhost:3000/admin#access_token=tok123&refresh_token=ref456&expires_in=3600&token_type=bearer",
    )?;
    ensure!(harness.provider.restore_from_redirect(&redirect).await?);

    let state = harness.store.initialize().await;

    ensure!(state.is_admin, "expected admin: {state:?}");
    ensure!(state.email.as_deref() == Some(ADMIN_EMAIL));
    ensure!(state.first_name.as_deref() == Some("Ada"));
    ensure!(!state.loading);
    ensure!(harness.store.phase() == AuthPhase::Authenticated);
    Ok(())
}

#[tokio::test]
async fn wrong_password_leaves_state_unchanged() -> Result<()> {
    let harness = Harness::start().await?;
    let before = harness.store.initialize().await;

    let result = harness
        .store
        .sign_in(Some(ADMIN_EMAIL), Some("wrong"))
        .await;

    ensure!(
        result == Err(AuthError::Provider("Invalid credentials".to_string())),
        "unexpected result: {result:?}"
    );
    ensure!(harness.store.snapshot() == before);
    Ok(())
}

#[tokio::test]
async fn sign_in_then_sign_out() -> Result<()> {
    let harness = Harness::start().await?;
    harness.store.initialize().await;
    let mut updates = harness.store.subscribe();

    let state = harness
        .store
        .sign_in(Some(ADMIN_EMAIL), Some(PASSWORD))
        .await?;
    ensure!(state.is_admin && state.email.as_deref() == Some(ADMIN_EMAIL));
    ensure!(*updates.borrow_and_update() == state);

    let reported = harness
        .store
        .check_session()
        .await
        .context("session check failed")?;
    ensure!(reported == state.projection());

    harness.store.sign_out().await;

    ensure!(!harness.store.snapshot().is_authenticated());
    ensure!(harness.navigator.last().as_deref() == Some("/login"));
    ensure!(harness.provider.get_session().await?.is_none());
    let server_view = harness.api.fetch_session().await?;
    ensure!(!server_view.is_authenticated(), "cookie survived logout");
    Ok(())
}

#[tokio::test]
async fn repeated_exchange_is_idempotent() -> Result<()> {
    let harness = Harness::start().await?;

    harness.api.exchange_token(ACCESS_TOKEN).await?;
    let first = harness.api.fetch_session().await?;
    harness.api.exchange_token(ACCESS_TOKEN).await?;
    let second = harness.api.fetch_session().await?;

    ensure!(first.is_admin && first == second, "{first:?} != {second:?}");
    Ok(())
}

#[tokio::test]
async fn rejected_token_surfaces_provider_message() -> Result<()> {
    let harness = Harness::start().await?;

    let result = harness.api.exchange_token("forged").await;

    ensure!(
        result == Err(AuthError::Exchange("Invalid JWT".to_string())),
        "unexpected result: {result:?}"
    );
    Ok(())
}

#[tokio::test]
async fn expired_provider_session_is_refreshed_then_exchanged() -> Result<()> {
    let harness = Harness::start().await?;
    harness
        .provider
        .set_session(
            ProviderSession::new("stale")
                .with_refresh_token(REFRESH_TOKEN)
                .with_expires_at(1),
        )
        .await;

    let state = harness.store.initialize().await;

    ensure!(state.is_admin, "expected admin: {state:?}");
    ensure!(state.email.as_deref() == Some(ADMIN_EMAIL));
    let refreshed = harness
        .provider
        .get_session()
        .await?
        .context("refreshed session missing")?;
    ensure!(refreshed.valid_access_token() == Some(ACCESS_TOKEN));
    Ok(())
}

#[tokio::test]
async fn revoked_refresh_token_clears_provider_session() -> Result<()> {
    let harness = Harness::start().await?;
    harness
        .provider
        .set_session(
            ProviderSession::new("stale")
                .with_refresh_token("revoked")
                .with_expires_at(1),
        )
        .await;

    let state = harness.store.initialize().await;

    ensure!(!state.loading && !state.is_authenticated(), "unexpected state: {state:?}");
    ensure!(harness.provider.get_session().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unreachable_provider_during_refresh_is_swallowed() -> Result<()> {
    let harness = Harness::start().await?;
    let closed = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let offline = Arc::new(SupabaseClient::new(
        &format!("http://{closed}"),
        SecretString::from("anon-key".to_string()),
    )?);
    offline
        .set_session(
            ProviderSession::new("stale")
                .with_refresh_token(REFRESH_TOKEN)
                .with_expires_at(1),
        )
        .await;
    let store = AuthStore::new(
        offline.clone(),
        harness.api.clone(),
        harness.navigator.clone(),
        "/login",
    );

    let state = store.initialize().await;

    ensure!(!state.loading && !state.is_authenticated(), "unexpected state: {state:?}");
    ensure!(store.phase() == AuthPhase::Anonymous);
    Ok(())
}
