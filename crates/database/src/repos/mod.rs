//! Database repository implementations

pub mod attachment_repository;
pub mod message_repository;
pub mod options_repository;
pub mod session_repository;
pub mod thread_repository;

pub use attachment_repository::{AttachmentRepository, CreateAttachmentRequest};
pub use message_repository::{CreateMessageRequest, MessageRepository};
pub use options_repository::OptionsRepository;
pub use session_repository::{Session, SessionRepository};
pub use thread_repository::ThreadRepository;
