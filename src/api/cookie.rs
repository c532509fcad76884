//! Signed session cookie: `<token>.<signature>`.
//!
//! The token is 32 random bytes (base64url), the signature an HMAC-SHA256 of
//! the token under the server's cookie secret. A cookie whose signature does
//! not verify is treated exactly like a missing cookie.

use anyhow::{Context, Result, ensure};
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

use super::state::SessionConfig;

type HmacSha256 = Hmac<Sha256>;

/// Minimum cookie secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

impl CookieSigner {
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_BYTES`].
    pub fn new(secret: &SecretString) -> Result<Self> {
        let key = secret.expose_secret().as_bytes();
        ensure!(
            key.len() >= MIN_SECRET_BYTES,
            "cookie secret must be at least {MIN_SECRET_BYTES} bytes"
        );
        let mac = HmacSha256::new_from_slice(key).context("invalid cookie secret")?;
        Ok(Self { mac })
    }

    #[must_use]
    pub fn sign(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        format!("{token}.{signature}")
    }

    /// Token carried by a signed cookie value, if the signature verifies.
    #[must_use]
    pub fn verify<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (token, signature) = value.rsplit_once('.')?;
        if token.is_empty() {
            return None;
        }
        let signature = Base64UrlUnpadded::decode_vec(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(token)
    }
}

/// Create a new session token for the cookie.
/// The raw value is only returned to set the cookie; storage gets a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// `Set-Cookie` value carrying a signed session token.
pub(crate) fn session_cookie(
    config: &SessionConfig,
    signer: &CookieSigner,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name(),
        signer.sign(token),
        config.session_ttl_seconds()
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &SessionConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name()
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Verified session token from the request cookies.
pub(crate) fn extract_session_token(
    headers: &HeaderMap,
    config: &SessionConfig,
    signer: &CookieSigner,
) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            if key.trim() == config.cookie_name() {
                if let Some(token) = signer.verify(val.trim()) {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}
