use serde::{Deserialize, Serialize};

/// Group key returned for extensions no group claims
pub const GENERAL_GROUP: &str = "general";

/// A named set of file extensions shown together in upload forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeGroup {
    /// Stable group key, e.g. `images`
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Lowercase extensions without a leading dot
    pub extensions: Vec<String>,
}

impl FileTypeGroup {
    /// Create a group, normalising extensions to lowercase
    pub fn new(key: impl Into<String>, label: impl Into<String>, extensions: &[&str]) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            extensions: extensions.iter().map(|ext| ext.to_lowercase()).collect(),
        }
    }

    /// Case-insensitive membership test
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|candidate| candidate.to_lowercase() == extension.to_lowercase())
    }
}

/// The built-in table, in declaration order.
///
/// Hooks registered on [`FILE_TYPES_HOOK`](crate::utils::FILE_TYPES_HOOK) are
/// applied on top of this by the classifier.
pub fn default_file_types() -> Vec<FileTypeGroup> {
    vec![
        FileTypeGroup::new("images", "Images", &["bmp", "png", "jpg", "jpeg", "gif"]),
        FileTypeGroup::new(
            "docs",
            "Documents",
            &["txt", "odt", "doc", "docx", "pdf", "xls", "xlsx", "ods", "ppt", "pptx"],
        ),
        FileTypeGroup::new("archives", "Archives", &["zip", "rar", "gz", "7z"]),
        FileTypeGroup::new("audio", "Audio", &["wav", "wma", "m4a", "amr", "mp2", "mp3"]),
        FileTypeGroup::new("video", "Video", &["mp4"]),
    ]
}
