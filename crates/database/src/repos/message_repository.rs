//! Repository for messages.

use async_trait::async_trait;
use msgat_attachments::{Message, MessageStore, StoreResult};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::types::DatabaseResult;

/// Fields for a new message
#[derive(Debug, Clone, Default)]
pub struct CreateMessageRequest {
    pub thread_id: i64,
    pub sender_id: i64,
    pub subject: String,
    pub message: String,
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateMessageRequest) -> DatabaseResult<Message> {
        let date_sent = chrono::Utc::now().to_rfc3339();

        let id = sqlx::query(
            "INSERT INTO messages (thread_id, sender_id, subject, message, date_sent)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(request.thread_id)
        .bind(request.sender_id)
        .bind(&request.subject)
        .bind(&request.message)
        .bind(&date_sent)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Message {
            id,
            thread_id: request.thread_id,
            sender_id: request.sender_id,
            subject: request.subject.clone(),
            message: request.message.clone(),
            date_sent,
        })
    }

    pub async fn find_by_id(&self, message_id: i64) -> DatabaseResult<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, thread_id, sender_id, subject, message, date_sent FROM messages WHERE id = ?",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(message_from_row).transpose()?)
    }
}

pub(crate) fn message_from_row(row: &SqliteRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        sender_id: row.try_get("sender_id")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        date_sent: row.try_get("date_sent")?,
    })
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn load_message(&self, message_id: i64) -> StoreResult<Option<Message>> {
        Ok(self.find_by_id(message_id).await?)
    }
}
