//! In-memory host implementing every collaborator trait

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    AttachmentStore, MessageStore, OptionsStore, SessionStore, ThreadStore,
    LINKED_MESSAGE_META_KEY,
};
use crate::entities::{Attachment, Message, Thread, ThreadLoad};
use crate::types::StoreResult;

/// Host backed by hash maps. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct InMemoryHost {
    threads: Arc<RwLock<HashMap<i64, Thread>>>,
    messages: Arc<RwLock<HashMap<i64, Message>>>,
    attachments: Arc<RwLock<HashMap<i64, Attachment>>>,
    attachment_meta: Arc<RwLock<HashMap<(i64, String), String>>>,
    sessions: Arc<RwLock<HashMap<String, i64>>>,
    options: Arc<RwLock<HashMap<String, Value>>>,
    upload_dir: Option<PathBuf>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative attachment paths against `upload_dir`
    pub fn with_upload_dir(mut self, upload_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(upload_dir.into());
        self
    }

    pub async fn insert_thread(&self, thread_id: i64, participant_ids: &[i64]) {
        let thread = Thread::new(thread_id, participant_ids.iter().copied());
        self.threads.write().await.insert(thread_id, thread);
    }

    pub async fn insert_message(&self, message_id: i64, thread_id: i64, sender_id: i64) {
        let message = Message {
            id: message_id,
            thread_id,
            sender_id,
            subject: String::new(),
            message: String::new(),
            date_sent: String::new(),
        };
        self.messages.write().await.insert(message_id, message);
    }

    pub async fn insert_attachment(&self, attachment: Attachment) {
        self.attachments
            .write()
            .await
            .insert(attachment.id, attachment);
    }

    pub async fn set_attachment_meta(&self, attachment_id: i64, key: &str, value: impl Into<String>) {
        self.attachment_meta
            .write()
            .await
            .insert((attachment_id, key.to_string()), value.into());
    }

    /// Record that `attachment_id` was uploaded with `message_id`
    pub async fn link_attachment(&self, attachment_id: i64, message_id: i64) {
        self.set_attachment_meta(attachment_id, LINKED_MESSAGE_META_KEY, message_id.to_string())
            .await;
    }

    pub async fn insert_session(&self, token: &str, user_id: i64) {
        self.sessions
            .write()
            .await
            .insert(token.to_string(), user_id);
    }
}

#[async_trait]
impl ThreadStore for InMemoryHost {
    async fn load_thread(&self, thread_id: i64, load: ThreadLoad) -> StoreResult<Option<Thread>> {
        let Some(mut thread) = self.threads.read().await.get(&thread_id).cloned() else {
            return Ok(None);
        };

        if load.include_messages {
            let mut messages: Vec<Message> = self
                .messages
                .read()
                .await
                .values()
                .filter(|m| m.thread_id == thread_id)
                .cloned()
                .collect();
            messages.sort_by_key(|m| m.id);
            thread.messages = messages;
        }

        Ok(Some(thread))
    }
}

#[async_trait]
impl MessageStore for InMemoryHost {
    async fn load_message(&self, message_id: i64) -> StoreResult<Option<Message>> {
        Ok(self.messages.read().await.get(&message_id).cloned())
    }
}

#[async_trait]
impl AttachmentStore for InMemoryHost {
    async fn attachment_meta(&self, attachment_id: i64, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .attachment_meta
            .read()
            .await
            .get(&(attachment_id, key.to_string()))
            .cloned())
    }

    async fn load_attachment(&self, attachment_id: i64) -> StoreResult<Option<Attachment>> {
        Ok(self.attachments.read().await.get(&attachment_id).cloned())
    }

    async fn attached_file_path(&self, attachment_id: i64) -> StoreResult<Option<PathBuf>> {
        let attachments = self.attachments.read().await;
        let Some(attachment) = attachments.get(&attachment_id) else {
            return Ok(None);
        };
        if attachment.file_path.is_empty() {
            return Ok(None);
        }

        let stored = PathBuf::from(&attachment.file_path);
        Ok(Some(match &self.upload_dir {
            Some(base) if stored.is_relative() => base.join(stored),
            _ => stored,
        }))
    }
}

#[async_trait]
impl SessionStore for InMemoryHost {
    async fn resolve_user(&self, token: &str) -> StoreResult<Option<i64>> {
        Ok(self.sessions.read().await.get(token).copied())
    }
}

#[async_trait]
impl OptionsStore for InMemoryHost {
    async fn load_option(&self, name: &str) -> StoreResult<Option<Value>> {
        Ok(self.options.read().await.get(name).cloned())
    }

    async fn save_option(&self, name: &str, value: &Value) -> StoreResult<()> {
        self.options
            .write()
            .await
            .insert(name.to_string(), value.clone());
        Ok(())
    }
}
