use serde::{Deserialize, Serialize};

/// Entity type blob storage assigns to uploaded files
pub const ATTACHMENT_ENTITY_TYPE: &str = "attachment";

/// A stored file as recorded by blob storage
///
/// The link to a message is kept as separate metadata, see
/// [`LINKED_MESSAGE_META_KEY`](crate::repositories::LINKED_MESSAGE_META_KEY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment ID
    pub id: i64,
    /// Storage entity type, `"attachment"` for uploaded files
    pub entity_type: String,
    /// Display title
    pub title: String,
    /// MIME type recorded at upload time
    pub mime_type: String,
    /// Stored path, absolute or relative to the upload directory
    pub file_path: String,
}

impl Attachment {
    /// Create an attachment record of the blob entity type
    pub fn new(id: i64, mime_type: impl Into<String>, file_path: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let title = std::path::Path::new(&file_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id,
            entity_type: ATTACHMENT_ENTITY_TYPE.to_string(),
            title,
            mime_type: mime_type.into(),
            file_path,
        }
    }

    /// Whether the record really is an uploaded file and not some other entity
    pub fn is_attachment(&self) -> bool {
        self.entity_type == ATTACHMENT_ENTITY_TYPE
    }
}
