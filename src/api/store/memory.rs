//! In-process session store, used when no database is configured.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AdminProfile, SessionRecord, SessionStore};
use crate::identity::unix_now;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Vec<u8>, SessionRecord>>,
    admins: HashMap<String, AdminProfile>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the admin directory; emails are expected to be normalized.
    #[must_use]
    pub fn with_admins(mut self, admins: impl IntoIterator<Item = AdminProfile>) -> Self {
        self.admins
            .extend(admins.into_iter().map(|admin| (admin.email.clone(), admin)));
        self
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save_session(&self, token_hash: &[u8], record: &SessionRecord) -> Result<()> {
        let now = unix_now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.is_live_at(now));
        sessions.insert(token_hash.to_vec(), record.clone());
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        let now = unix_now();
        Ok(self
            .sessions
            .read()
            .await
            .get(token_hash)
            .filter(|session| session.is_live_at(now))
            .cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        self.sessions.write().await.remove(token_hash);
        Ok(())
    }

    async fn lookup_admin(&self, email: &str) -> Result<Option<AdminProfile>> {
        Ok(self.admins.get(email).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
