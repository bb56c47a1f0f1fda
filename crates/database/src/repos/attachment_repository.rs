//! Repository for blob storage records and their metadata.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use msgat_attachments::{
    Attachment, AttachmentStore, StoreResult, ATTACHMENT_ENTITY_TYPE, LINKED_MESSAGE_META_KEY,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

use crate::types::{DatabaseError, DatabaseResult};

/// Fields for a new blob storage record
#[derive(Debug, Clone)]
pub struct CreateAttachmentRequest {
    pub title: String,
    pub mime_type: String,
    /// Absolute, or relative to the upload directory
    pub file_path: String,
    pub entity_type: String,
}

impl CreateAttachmentRequest {
    /// An uploaded file; the title defaults to the file stem
    pub fn upload(mime_type: impl Into<String>, file_path: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let title = Path::new(&file_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            title,
            mime_type: mime_type.into(),
            file_path,
            entity_type: ATTACHMENT_ENTITY_TYPE.to_string(),
        }
    }
}

/// Repository for attachment database operations
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: SqlitePool,
    upload_dir: PathBuf,
}

impl AttachmentRepository {
    /// Relative file paths are resolved against `upload_dir`
    pub fn new(pool: SqlitePool, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub async fn create(&self, request: &CreateAttachmentRequest) -> DatabaseResult<Attachment> {
        let now = chrono::Utc::now().to_rfc3339();

        let id = sqlx::query(
            "INSERT INTO attachments (entity_type, title, mime_type, file_path, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.entity_type)
        .bind(&request.title)
        .bind(&request.mime_type)
        .bind(&request.file_path)
        .bind(&now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("attachment {id}")))
    }

    pub async fn find_by_id(&self, attachment_id: i64) -> DatabaseResult<Option<Attachment>> {
        let row = sqlx::query(
            "SELECT id, entity_type, title, mime_type, file_path FROM attachments WHERE id = ?",
        )
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(attachment_from_row).transpose()?)
    }

    pub async fn list(&self) -> DatabaseResult<Vec<Attachment>> {
        let rows = sqlx::query(
            "SELECT id, entity_type, title, mime_type, file_path FROM attachments ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(attachment_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn get_meta(&self, attachment_id: i64, key: &str) -> DatabaseResult<Option<String>> {
        let value = sqlx::query_scalar(
            "SELECT meta_value FROM attachment_meta WHERE attachment_id = ? AND meta_key = ?",
        )
        .bind(attachment_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    /// Insert or replace a metadata value
    pub async fn set_meta(&self, attachment_id: i64, key: &str, value: &str) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO attachment_meta (attachment_id, meta_key, meta_value) VALUES (?, ?, ?)
             ON CONFLICT(attachment_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
        )
        .bind(attachment_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the message an attachment was uploaded with
    pub async fn link_to_message(&self, attachment_id: i64, message_id: i64) -> DatabaseResult<()> {
        self.set_meta(attachment_id, LINKED_MESSAGE_META_KEY, &message_id.to_string())
            .await?;
        info!(attachment_id, message_id, "attachment linked to message");
        Ok(())
    }

    fn resolve(&self, stored: &str) -> Option<PathBuf> {
        if stored.is_empty() {
            return None;
        }
        let stored = PathBuf::from(stored);
        Some(if stored.is_relative() {
            self.upload_dir.join(stored)
        } else {
            stored
        })
    }
}

fn attachment_from_row(row: &SqliteRow) -> Result<Attachment, sqlx::Error> {
    Ok(Attachment {
        id: row.try_get("id")?,
        entity_type: row.try_get("entity_type")?,
        title: row.try_get("title")?,
        mime_type: row.try_get("mime_type")?,
        file_path: row.try_get("file_path")?,
    })
}

#[async_trait]
impl AttachmentStore for AttachmentRepository {
    async fn attachment_meta(&self, attachment_id: i64, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get_meta(attachment_id, key).await?)
    }

    async fn load_attachment(&self, attachment_id: i64) -> StoreResult<Option<Attachment>> {
        Ok(self.find_by_id(attachment_id).await?)
    }

    async fn attached_file_path(&self, attachment_id: i64) -> StoreResult<Option<PathBuf>> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT file_path FROM attachments WHERE id = ?")
                .bind(attachment_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        Ok(stored.as_deref().and_then(|path| self.resolve(path)))
    }
}
