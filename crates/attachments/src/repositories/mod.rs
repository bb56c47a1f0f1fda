//! Host collaborator interfaces.
//!
//! Thread storage, blob storage, sessions and option storage belong to the
//! host application. The access gateway only talks to them through these
//! traits; `msgat-database` provides SQLite implementations and
//! [`InMemoryHost`] provides one for tests and embedding.

pub mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::{Attachment, Message, Thread, ThreadLoad};
use crate::types::StoreResult;

pub use memory::InMemoryHost;

/// Attachment metadata key holding the ID of the message it was uploaded with
pub const LINKED_MESSAGE_META_KEY: &str = "_msgat_message_id";

/// Read access to message threads
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Load a thread with its recipients. `Ok(None)` if it does not exist.
    async fn load_thread(&self, thread_id: i64, load: ThreadLoad) -> StoreResult<Option<Thread>>;
}

/// Read access to individual messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn load_message(&self, message_id: i64) -> StoreResult<Option<Message>>;
}

/// Read access to blob storage
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Raw metadata value stored against an attachment
    async fn attachment_meta(&self, attachment_id: i64, key: &str) -> StoreResult<Option<String>>;

    async fn load_attachment(&self, attachment_id: i64) -> StoreResult<Option<Attachment>>;

    /// Absolute path of the stored file, if one is recorded
    async fn attached_file_path(&self, attachment_id: i64) -> StoreResult<Option<PathBuf>>;
}

/// Identity provider: resolves a session token to a user ID
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// `Ok(None)` for unknown or expired tokens
    async fn resolve_user(&self, token: &str) -> StoreResult<Option<i64>>;
}

/// Persistent key-value option storage
#[async_trait]
pub trait OptionsStore: Send + Sync {
    async fn load_option(&self, name: &str) -> StoreResult<Option<Value>>;

    async fn save_option(&self, name: &str, value: &Value) -> StoreResult<()>;
}
