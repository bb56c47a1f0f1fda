//! Named filter hooks.
//!
//! A hook is an ordered list of transforms applied to a value, in
//! registration order. Hosts use them to extend the file-type table without
//! touching this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::entities::FileTypeGroup;

/// Hook that receives the file-type table before the classifier uses it
pub const FILE_TYPES_HOOK: &str = "msgat_file_types";

type Filter<T> = dyn Fn(T) -> T + Send + Sync;

/// Handle returned by [`FilterRegistry::add_filter`], used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

/// Registry of transform functions keyed by hook name
pub struct FilterRegistry<T = Vec<FileTypeGroup>> {
    filters: RwLock<HashMap<String, Vec<(FilterId, Arc<Filter<T>>)>>>,
    next_id: AtomicU64,
    generation: AtomicU64,
}

impl<T> Default for FilterRegistry<T> {
    fn default() -> Self {
        Self {
            filters: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            generation: AtomicU64::new(0),
        }
    }
}

impl<T> std::fmt::Debug for FilterRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filters = self.filters.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = filters
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("FilterRegistry")
            .field("filters", &counts)
            .field("generation", &self.generation())
            .finish()
    }
}

impl<T> FilterRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `filter` to the hook's list
    pub fn add_filter<F>(&self, hook: &str, filter: F) -> FilterId
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        let id = FilterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut filters = self.filters.write().unwrap_or_else(PoisonError::into_inner);
            filters
                .entry(hook.to_string())
                .or_default()
                .push((id, Arc::new(filter)));
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(hook, ?id, "filter registered");
        id
    }

    /// Remove a previously registered filter. Returns false if it was not registered.
    pub fn remove_filter(&self, hook: &str, id: FilterId) -> bool {
        let removed = {
            let mut filters = self.filters.write().unwrap_or_else(PoisonError::into_inner);
            match filters.get_mut(hook) {
                Some(list) => {
                    let before = list.len();
                    list.retain(|(existing, _)| *existing != id);
                    list.len() != before
                }
                None => false,
            }
        };

        if removed {
            self.generation.fetch_add(1, Ordering::AcqRel);
            tracing::debug!(hook, ?id, "filter removed");
        }
        removed
    }

    /// Run `value` through every filter on `hook`
    pub fn apply(&self, hook: &str, value: T) -> T {
        // Snapshot so filters can touch the registry without deadlocking.
        let snapshot: Vec<Arc<Filter<T>>> = {
            let filters = self.filters.read().unwrap_or_else(PoisonError::into_inner);
            filters
                .get(hook)
                .map(|list| list.iter().map(|(_, f)| Arc::clone(f)).collect())
                .unwrap_or_default()
        };

        snapshot.iter().fold(value, |acc, filter| filter(acc))
    }

    /// Number of filters on `hook`
    pub fn len(&self, hook: &str) -> usize {
        let filters = self.filters.read().unwrap_or_else(PoisonError::into_inner);
        filters.get(hook).map_or(0, Vec::len)
    }

    /// Bumped on every registration change
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
