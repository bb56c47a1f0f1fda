//! msgat Database Crate
//!
//! SQLite host for the attachment service: connection management, migrations,
//! and repositories implementing the collaborator traits of
//! `msgat-attachments` (threads, messages, blob storage, sessions, options).

use sqlx::SqlitePool;
use msgat_config::DatabaseConfig;

pub mod connection;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{
    AttachmentRepository, CreateAttachmentRequest, CreateMessageRequest, MessageRepository,
    OptionsRepository, Session, SessionRepository, ThreadRepository,
};

pub use types::{errors::DatabaseError, DatabaseResult};

/// Re-export commonly used types for convenience
pub use sqlx::Pool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}
