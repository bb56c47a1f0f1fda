//! # msgat Attachments Crate
//!
//! Domain logic for file attachments on private message threads. It knows how
//! to group file extensions for upload forms and validation, and how to decide
//! whether a viewer may download an attachment from a thread.
//!
//! ## Architecture
//!
//! - **Entities**: Threads, messages, attachments, file-type groups and plugin options
//! - **Repositories**: Traits for the host collaborators (thread storage, blob
//!   storage, sessions, option storage) plus an in-memory host
//! - **Services**: File-type classifier, upload policy and the access gateway
//! - **Types**: Error and outcome types
//! - **Utils**: Filter hooks and route-variable coercion
//!
//! ## Usage
//!
//! ```rust,ignore
//! use msgat_attachments::{AccessGateway, DownloadRoute};
//!
//! let gateway = AccessGateway::new(threads, messages, attachments);
//! let route = DownloadRoute::from_action_variables("12", "40");
//! let download = gateway.open(route, viewer_id).await?;
//! ```

pub mod entities;
pub mod repositories;
pub mod services;
pub mod types;
pub mod utils;

pub use entities::{
    default_file_types, Attachment, FileTypeGroup, Message, OptionScope, PluginOptions, Recipient,
    Thread, ThreadLoad, ATTACHMENT_ENTITY_TYPE, GENERAL_GROUP,
};
pub use repositories::{
    AttachmentStore, InMemoryHost, MessageStore, OptionsStore, SessionStore, ThreadStore,
    LINKED_MESSAGE_META_KEY,
};
pub use services::{
    AccessGateway, AllowedGroup, AuthorizedDownload, DownloadFile, DownloadRoute,
    FileTypeClassifier, UploadHints, UploadPolicy,
};
pub use types::{DownloadDenied, StoreError, StoreResult, UploadRejection};
pub use utils::{coerce_id, FilterId, FilterRegistry, FILE_TYPES_HOOK, NO_SESSION};
