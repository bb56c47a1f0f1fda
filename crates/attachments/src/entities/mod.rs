//! Domain entities for attachments on private message threads.
//!
//! Threads, messages and attachments are owned by the host collaborators;
//! this crate only reads them.

pub mod attachment;
pub mod file_type;
pub mod options;
pub mod thread;

pub use attachment::{Attachment, ATTACHMENT_ENTITY_TYPE};
pub use file_type::{default_file_types, FileTypeGroup, GENERAL_GROUP};
pub use options::{OptionScope, PluginOptions, OPTION_FILE_TYPES, OPTION_LOAD_CSS, OPTION_MAX_SIZE};
pub use thread::{Message, Recipient, Thread, ThreadLoad};
