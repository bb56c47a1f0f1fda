//! File-type classifier.

use std::sync::{Arc, PoisonError, RwLock};

use crate::entities::{default_file_types, FileTypeGroup, GENERAL_GROUP};
use crate::utils::{FilterRegistry, FILE_TYPES_HOOK};

struct CachedTable {
    generation: u64,
    groups: Arc<Vec<FileTypeGroup>>,
}

/// Maps file extensions to file-type groups.
///
/// The table is the default one run through the [`FILE_TYPES_HOOK`] filters.
/// It is cached and rebuilt whenever the hook registry changes.
pub struct FileTypeClassifier {
    hooks: Arc<FilterRegistry>,
    cache: RwLock<Option<CachedTable>>,
}

impl Default for FileTypeClassifier {
    fn default() -> Self {
        Self::new(Arc::new(FilterRegistry::new()))
    }
}

impl FileTypeClassifier {
    pub fn new(hooks: Arc<FilterRegistry>) -> Self {
        Self {
            hooks,
            cache: RwLock::new(None),
        }
    }

    /// The registry whose `msgat_file_types` filters shape the table
    pub fn hooks(&self) -> &Arc<FilterRegistry> {
        &self.hooks
    }

    /// Every group, in the order classification checks them
    pub fn all_file_types(&self) -> Arc<Vec<FileTypeGroup>> {
        let generation = self.hooks.generation();

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = cache.as_ref().filter(|c| c.generation == generation) {
                return Arc::clone(&cached.groups);
            }
        }

        let groups = Arc::new(self.hooks.apply(FILE_TYPES_HOOK, default_file_types()));
        tracing::debug!(generation, groups = groups.len(), "rebuilt file type table");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(CachedTable {
            generation,
            groups: Arc::clone(&groups),
        });
        groups
    }

    /// Group key for a bare extension, `"general"` if no group claims it.
    ///
    /// Matching is case-insensitive and a single leading dot is ignored.
    pub fn classify(&self, extension: &str) -> String {
        let extension = extension.strip_prefix('.').unwrap_or(extension);

        self.all_file_types()
            .iter()
            .find(|group| group.contains(extension))
            .map(|group| group.key.clone())
            .unwrap_or_else(|| GENERAL_GROUP.to_string())
    }

    /// Group key for either a file name or a bare extension such as `"pdf"`
    pub fn classify_name(&self, name: &str) -> String {
        self.classify(extension_or_bare(name))
    }

    /// Look up a group by key
    pub fn group(&self, key: &str) -> Option<FileTypeGroup> {
        self.all_file_types()
            .iter()
            .find(|group| group.key == key)
            .cloned()
    }

    pub fn group_label(&self, key: &str) -> Option<String> {
        self.group(key).map(|group| group.label)
    }

    pub fn extensions_for(&self, key: &str) -> Vec<String> {
        self.group(key).map(|group| group.extensions).unwrap_or_default()
    }
}

/// Extension of the final path component, without the dot
pub(crate) fn extension_of(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Extension of a file name, or the trimmed input itself when it has none
pub(crate) fn extension_or_bare(name: &str) -> &str {
    let name = name.trim();
    extension_of(name).unwrap_or_else(|| name.strip_prefix('.').unwrap_or(name))
}
