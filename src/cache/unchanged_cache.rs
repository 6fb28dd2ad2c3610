use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cache::ContentFingerprint;

/// Remembers what every file looked like the last time it passed through,
/// per named cache.
#[derive(Debug, Clone, Default)]
pub struct UnchangedCache {
    caches: HashMap<String, HashMap<PathBuf, ContentFingerprint>>,
}

impl UnchangedCache {
    /// Records `contents` for `path` and reports whether the file should pass
    /// through, i.e. it is new or differs from the previous run.
    pub fn admit(&mut self, cache: &str, path: &Path, contents: &str) -> bool {
        let fingerprint = ContentFingerprint::from(contents);
        let entries = self.caches.entry(cache.to_string()).or_default();

        match entries.insert(path.to_path_buf(), fingerprint) {
            Some(previous) if previous == fingerprint => {
                debug!("Skipping unchanged file {}", path.display());
                false
            }
            _ => true,
        }
    }

    pub fn forget(&mut self, cache: &str, path: &Path) -> bool {
        self.caches
            .get_mut(cache)
            .and_then(|entries| entries.remove(path))
            .is_some()
    }

    pub fn contains(&self, cache: &str, path: &Path) -> bool {
        self.caches
            .get(cache)
            .is_some_and(|entries| entries.contains_key(path))
    }
}
