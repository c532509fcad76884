use crate::cli::actions::{Action, server::Args};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .map(|dsn| dsn.trim().to_string())
        .filter(|dsn| !dsn.is_empty());

    let frontend_base_url = required(matches, "frontend-base-url")?;
    let identity_url = required(matches, "identity-url")?;
    let identity_anon_key = SecretString::from(required(matches, "identity-anon-key")?);
    let cookie_secret = SecretString::from(required(matches, "cookie-secret")?);

    let session_ttl_seconds = matches
        .get_one::<i64>("session-ttl-seconds")
        .copied()
        .unwrap_or(crate::api::state::DEFAULT_SESSION_TTL_SECONDS);

    let admin_emails = matches
        .get_many::<String>("admin-email")
        .map(|emails| {
            emails
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url,
        identity_url,
        identity_anon_key,
        cookie_secret,
        session_ttl_seconds,
        admin_emails,
    }))
}

fn required(matches: &clap::ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}
