//! Server-side session storage.
//!
//! Sessions are keyed by the SHA-256 hash of the cookie token; raw tokens never
//! reach storage. The admin directory answers which emails get `is_admin`.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

/// Session as stored server-side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub expires_at_unix: i64,
}

impl SessionRecord {
    #[must_use]
    pub fn is_live_at(&self, now_unix: i64) -> bool {
        self.expires_at_unix > now_unix
    }
}

/// Entry of the admin directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace the session stored under `token_hash`.
    async fn save_session(&self, token_hash: &[u8], record: &SessionRecord) -> Result<()>;

    /// Live session for `token_hash`; expired sessions are reported as missing.
    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()>;

    /// Admin directory entry for an already-normalized email.
    async fn lookup_admin(&self, email: &str) -> Result<Option<AdminProfile>>;

    async fn ping(&self) -> Result<()>;
}
