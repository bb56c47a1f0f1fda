//! Repository for message threads and their recipients.

use async_trait::async_trait;
use msgat_attachments::{Message, Recipient, StoreResult, Thread, ThreadLoad, ThreadStore};
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::message_repository::message_from_row;
use crate::types::DatabaseResult;

/// Repository for thread database operations
#[derive(Clone)]
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a thread with the given participants, returning its ID
    pub async fn create(&self, participant_ids: &[i64]) -> DatabaseResult<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let thread_id = sqlx::query("INSERT INTO message_threads (created_at) VALUES (?)")
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for user_id in participant_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO message_recipients (thread_id, user_id) VALUES (?, ?)",
            )
            .bind(thread_id)
            .bind(*user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(thread_id, participants = participant_ids.len(), "thread created");
        Ok(thread_id)
    }

    /// Add a participant. Adding an existing participant is a no-op.
    pub async fn add_recipient(&self, thread_id: i64, user_id: i64) -> DatabaseResult<()> {
        sqlx::query("INSERT OR IGNORE INTO message_recipients (thread_id, user_id) VALUES (?, ?)")
            .bind(thread_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, thread_id: i64, load: ThreadLoad) -> DatabaseResult<Option<Thread>> {
        let exists = sqlx::query("SELECT id FROM message_threads WHERE id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let recipients = sqlx::query(
            "SELECT thread_id, user_id FROM message_recipients WHERE thread_id = ? ORDER BY id ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            Ok(Recipient {
                thread_id: row.try_get("thread_id")?,
                user_id: row.try_get("user_id")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let messages = if load.include_messages {
            sqlx::query(
                "SELECT id, thread_id, sender_id, subject, message, date_sent
                 FROM messages WHERE thread_id = ? ORDER BY id ASC",
            )
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<Message>, sqlx::Error>>()?
        } else {
            Vec::new()
        };

        Ok(Some(Thread {
            id: thread_id,
            recipients,
            messages,
        }))
    }

    /// Threads a user participates in, newest first
    pub async fn list_for_user(&self, user_id: i64) -> DatabaseResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT thread_id FROM message_recipients WHERE user_id = ? ORDER BY thread_id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn list_ids(&self) -> DatabaseResult<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT id FROM message_threads ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl ThreadStore for ThreadRepository {
    async fn load_thread(&self, thread_id: i64, load: ThreadLoad) -> StoreResult<Option<Thread>> {
        Ok(self.find_by_id(thread_id, load).await?)
    }
}
