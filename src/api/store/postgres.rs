//! Postgres-backed session store. Schema lives in `sql/schema.sql`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use tracing::Instrument;

use super::{AdminProfile, SessionRecord, SessionStore};

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save_session(&self, token_hash: &[u8], record: &SessionRecord) -> Result<()> {
        let prune = "DELETE FROM sessions WHERE expires_at <= NOW()";
        sqlx::query(prune)
            .execute(&self.pool)
            .instrument(query_span("DELETE", prune))
            .await
            .context("failed to prune expired sessions")?;

        let query = r"
            INSERT INTO sessions
                (token_hash, user_id, email, first_name, last_name, is_admin, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, to_timestamp($7))
            ON CONFLICT (token_hash) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                is_admin = EXCLUDED.is_admin,
                expires_at = EXCLUDED.expires_at
        ";
        sqlx::query(query)
            .bind(token_hash)
            .bind(record.user_id)
            .bind(&record.email)
            .bind(&record.first_name)
            .bind(&record.last_name)
            .bind(record.is_admin)
            .bind(record.expires_at_unix)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to save session")?;

        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT user_id, email, first_name, last_name, is_admin,
                   EXTRACT(EPOCH FROM expires_at)::BIGINT AS expires_at_unix
            FROM sessions
            WHERE token_hash = $1 AND expires_at > NOW()
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| SessionRecord {
            user_id: row.get("user_id"),
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            is_admin: row.get("is_admin"),
            expires_at_unix: row.get("expires_at_unix"),
        }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn lookup_admin(&self, email: &str) -> Result<Option<AdminProfile>> {
        let query = "SELECT email, first_name, last_name FROM admin_users WHERE lower(email) = $1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup admin user")?;

        Ok(row.map(|row| AdminProfile {
            email: row.get("email"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
        }))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .instrument(tracing::info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            ))
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(tracing::info_span!(
                "db.ping",
                db.system = "postgresql",
                db.operation = "PING"
            ))
            .await
            .context("failed to ping database")
    }
}
