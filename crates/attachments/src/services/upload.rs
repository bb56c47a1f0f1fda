//! Upload validation derived from the plugin options.

use serde::Serialize;

use super::classifier::{extension_of, extension_or_bare, FileTypeClassifier};
use crate::entities::{PluginOptions, GENERAL_GROUP};
use crate::types::UploadRejection;

/// Allowed extensions and size limit, as configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    max_size_mb: u64,
    max_size_bytes: u64,
    load_css: bool,
}

/// What an upload form needs to know to validate client-side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadHints {
    pub max_size_mb: u64,
    pub max_size_bytes: u64,
    pub load_css: bool,
    pub groups: Vec<AllowedGroup>,
}

/// Allowed extensions belonging to one file-type group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllowedGroup {
    pub key: String,
    pub label: String,
    pub extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn from_options(options: &PluginOptions) -> Self {
        Self {
            allowed_extensions: options.file_types(),
            max_size_mb: options.max_size_mb(),
            max_size_bytes: options.max_size_bytes(),
            load_css: options.load_css(),
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn is_allowed(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == extension)
    }

    /// Whether a file name, or a bare extension, carries an allowed extension
    pub fn allows_name(&self, name: &str) -> bool {
        let extension = extension_or_bare(name);
        !extension.is_empty() && self.is_allowed(extension)
    }

    /// Validate a prospective upload and return its file-type group
    pub fn check(
        &self,
        classifier: &FileTypeClassifier,
        file_name: &str,
        size_bytes: u64,
    ) -> Result<String, UploadRejection> {
        if file_name.trim().is_empty() {
            return Err(UploadRejection::EmptyName);
        }

        let extension = extension_of(file_name.trim()).ok_or(UploadRejection::MissingExtension)?;

        if !self.is_allowed(extension) {
            return Err(UploadRejection::ExtensionNotAllowed {
                extension: extension.to_lowercase(),
            });
        }

        if size_bytes > self.max_size_bytes {
            return Err(UploadRejection::TooLarge {
                size_bytes,
                max_size_mb: self.max_size_mb,
            });
        }

        Ok(classifier.classify(extension))
    }

    /// Allowed extensions grouped by file-type group, in table order.
    ///
    /// Extensions no group claims are collected under `general` at the end.
    pub fn hints(&self, classifier: &FileTypeClassifier) -> UploadHints {
        let table = classifier.all_file_types();

        let mut groups: Vec<AllowedGroup> = table
            .iter()
            .map(|group| AllowedGroup {
                key: group.key.clone(),
                label: group.label.clone(),
                extensions: Vec::new(),
            })
            .collect();
        let mut general = AllowedGroup {
            key: GENERAL_GROUP.to_string(),
            label: "Other".to_string(),
            extensions: Vec::new(),
        };

        for extension in &self.allowed_extensions {
            let key = classifier.classify(extension);
            match groups.iter_mut().find(|group| group.key == key) {
                Some(group) => group.extensions.push(extension.clone()),
                None => general.extensions.push(extension.clone()),
            }
        }

        groups.retain(|group| !group.extensions.is_empty());
        if !general.extensions.is_empty() {
            groups.push(general);
        }

        UploadHints {
            max_size_mb: self.max_size_mb,
            max_size_bytes: self.max_size_bytes,
            load_css: self.load_css,
            groups,
        }
    }
}
