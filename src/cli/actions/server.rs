use crate::{
    api::{
        self, SessionConfig, SessionState,
        cookie::CookieSigner,
        handlers::{normalize_email, valid_email},
        store::{AdminProfile, MemorySessionStore, PgSessionStore, SessionStore},
    },
    identity::SupabaseClient,
};
use anyhow::{Context, Result, ensure};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub frontend_base_url: String,
    pub identity_url: String,
    pub identity_anon_key: SecretString,
    pub cookie_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub admin_emails: Vec<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the configuration is
/// invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store = session_store(args.dsn.as_deref(), &args.admin_emails).await?;

    let verifier = SupabaseClient::new(&args.identity_url, args.identity_anon_key)
        .context("Invalid identity provider configuration")?;
    let signer = CookieSigner::new(&args.cookie_secret)?;

    let config = SessionConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds);

    let state = Arc::new(SessionState::new(config, signer, store, Arc::new(verifier)));

    api::new(args.port, state).await
}

async fn session_store(dsn: Option<&str>, admin_emails: &[String]) -> Result<Arc<dyn SessionStore>> {
    if let Some(dsn) = dsn {
        if !admin_emails.is_empty() {
            warn!("--admin-email is ignored with --dsn, admins are read from admin_users");
        }

        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        info!("Using Postgres session store");
        return Ok(Arc::new(PgSessionStore::new(pool)));
    }

    let mut admins = Vec::with_capacity(admin_emails.len());
    for email in admin_emails {
        let email = normalize_email(email);
        ensure!(valid_email(&email), "invalid --admin-email: {email}");
        admins.push(AdminProfile {
            email,
            first_name: None,
            last_name: None,
        });
    }

    info!("Using in-memory session store with {} admin(s)", admins.len());
    Ok(Arc::new(MemorySessionStore::new().with_admins(admins)))
}
