use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use tracing::{info, warn};

use crate::{
    error::{Result, TriageError},
    session::TriageSession,
    storage::SessionStore,
};

/// Postgres-backed session store. Each session is one JSONB document.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| TriageError::StorageError(format!("Failed to connect: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Postgres session store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS triage_sessions (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                data JSONB NOT NULL,
                revision BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TriageError::StorageError(format!("Migration failed: {e}")))?;

        sqlx::query(
            "ALTER TABLE triage_sessions ADD COLUMN IF NOT EXISTS revision BIGINT NOT NULL DEFAULT 0",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TriageError::StorageError(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

fn revision_param(revision: u64) -> Result<i64> {
    i64::try_from(revision)
        .map_err(|_| TriageError::Internal(format!("revision {revision} out of range")))
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session: TriageSession) -> Result<()> {
        let data = serde_json::to_value(&session)?;
        sqlx::query(
            r#"
            INSERT INTO triage_sessions (id, status, data, revision, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&session.id)
        .bind(session.status.as_str())
        .bind(data)
        .bind(revision_param(session.revision)?)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| TriageError::StorageError(format!("Failed to create session: {e}")))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TriageSession>> {
        let row = sqlx::query("SELECT data FROM triage_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TriageError::StorageError(format!("Failed to load session: {e}")))?;

        match row {
            Some(row) => {
                let data: serde_json::Value = row
                    .try_get("data")
                    .map_err(|e| TriageError::StorageError(e.to_string()))?;
                Ok(Some(serde_json::from_value(data)?))
            }
            None => Ok(None),
        }
    }

    /// Check and write happen in one statement, so of two replicas saving the
    /// same revision exactly one succeeds.
    async fn save(&self, mut session: TriageSession) -> Result<()> {
        let expected = revision_param(session.revision)?;
        session.revision += 1;
        let data = serde_json::to_value(&session)?;

        let result = if expected == 0 {
            // A session started by this turn may not be stored yet.
            sqlx::query(
                r#"
                INSERT INTO triage_sessions (id, status, data, revision, created_at, updated_at)
                VALUES ($1, $2, $3, 1, $4, $5)
                ON CONFLICT (id) DO UPDATE
                SET status = EXCLUDED.status,
                    data = EXCLUDED.data,
                    revision = EXCLUDED.revision,
                    updated_at = EXCLUDED.updated_at
                WHERE triage_sessions.revision = 0
                "#,
            )
            .bind(&session.id)
            .bind(session.status.as_str())
            .bind(data)
            .bind(session.created_at)
            .bind(session.updated_at)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE triage_sessions
                SET status = $2, data = $3, revision = revision + 1, updated_at = $4
                WHERE id = $1 AND revision = $5
                "#,
            )
            .bind(&session.id)
            .bind(session.status.as_str())
            .bind(data)
            .bind(session.updated_at)
            .bind(expected)
            .execute(&self.pool)
            .await
        }
        .map_err(|e| TriageError::StorageError(format!("Failed to save session: {e}")))?;

        if result.rows_affected() == 0 {
            warn!(session_id = %session.id, revision = expected, "stale session save rejected");
            return Err(TriageError::ConcurrentModification(session.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM triage_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TriageError::StorageError(format!("Failed to delete session: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}
