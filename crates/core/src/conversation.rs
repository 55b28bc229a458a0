use crate::error::PipelineError;
use crate::models::ConversationRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Append-only log of question/answer exchanges. Rows are never updated or
/// deleted; listing is newest-first.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn record(&self, user: &str, question: &str, answer: &str) -> Result<(), PipelineError>;

    async fn list_all(&self) -> Result<Vec<ConversationRecord>, PipelineError>;
}

/// SQLite-backed conversation log over the `conversas` table. The schema is
/// created if absent when connecting, before any traffic is accepted; the
/// timestamp is assigned by the store at insert time.
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    pub async fn connect(path: &Path) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversas (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                usuario VARCHAR(50) NOT NULL DEFAULT 'unknown',
                pergunta TEXT NOT NULL,
                resposta TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn record(&self, user: &str, question: &str, answer: &str) -> Result<(), PipelineError> {
        sqlx::query("INSERT INTO conversas (usuario, pergunta, resposta) VALUES (?1, ?2, ?3)")
            .bind(user)
            .bind(question)
            .bind(answer)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ConversationRecord>, PipelineError> {
        let rows = sqlx::query(
            "SELECT usuario, pergunta, resposta, timestamp
             FROM conversas
             ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(ConversationRecord {
                user: row.try_get("usuario")?,
                question: row.try_get("pergunta")?,
                answer: row.try_get("resposta")?,
                timestamp: row.try_get::<DateTime<Utc>, _>("timestamp")?,
            });
        }

        Ok(records)
    }
}
