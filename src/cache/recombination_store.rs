use std::collections::HashMap;
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;

/// Keeps the last processed version of every file, per named store, so a run
/// that only transformed a few files can still emit the complete set.
///
/// Entries keep the position of their first insertion.
#[derive(Debug, Clone)]
pub struct RecombinationStore<T> {
    stores: HashMap<String, LinkedHashMap<PathBuf, T>>,
}

impl<T> Default for RecombinationStore<T> {
    fn default() -> Self {
        Self {
            stores: HashMap::new(),
        }
    }
}

impl<T: Clone> RecombinationStore<T> {
    pub fn remember(&mut self, store: &str, path: &Path, item: T) {
        let entries = self.stores.entry(store.to_string()).or_default();
        match entries.get_mut(path) {
            Some(existing) => *existing = item,
            None => {
                entries.insert(path.to_path_buf(), item);
            }
        }
    }

    pub fn forget(&mut self, store: &str, path: &Path) -> bool {
        self.stores
            .get_mut(store)
            .and_then(|entries| entries.remove(path))
            .is_some()
    }

    /// Every remembered item, in first-insertion order.
    pub fn recall(&self, store: &str) -> Vec<T> {
        self.stores
            .get(store)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, store: &str, path: &Path) -> bool {
        self.stores
            .get(store)
            .is_some_and(|entries| entries.contains_key(path))
    }
}
