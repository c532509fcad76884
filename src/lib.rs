//! # Tessera (session bridge)
//!
//! `tessera` turns an identity-provider session held by a client into a
//! first-party, cookie-backed server session, and keeps the two in step.
//!
//! ## Server side (`api`)
//!
//! The server validates a provider access token, stores a session keyed by the
//! hash of a random token, and hands the token back in a signed `HttpOnly`
//! cookie. The rest of the backend only ever trusts that cookie.
//!
//! - `GET /api/admin/session` answers with the session projection, or the
//!   anonymous projection when there is no valid cookie.
//! - `POST /api/auth/login` exchanges `{accessToken}` for the cookie. Replaying a
//!   still-valid token refreshes the existing session.
//! - `POST /api/auth/logout` always clears the cookie.
//!
//! ## Client side (`client`)
//!
//! `AuthStore` is the single writer of the client's `AuthState`. It is created
//! once by the application root, reconciles exactly once on start-up (repairing
//! a missing server session from a provider session left behind by an OAuth
//! redirect), and afterwards changes only through `sign_in`, `sign_out` and
//! `check_session`. Consumers subscribe to a `watch` channel.
//!
//! ## Identity provider (`identity`)
//!
//! A Supabase GoTrue shaped REST client. Client side it signs in with a
//! password and keeps the provider session; server side it validates access
//! tokens.

pub mod api;
pub mod cli;
pub mod client;
pub mod identity;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
