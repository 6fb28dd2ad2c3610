use std::hash::Hasher;

use metrohash::MetroHash64;

/// Hash of a file's contents as it entered the cache stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(u64);

impl From<&str> for ContentFingerprint {
    fn from(contents: &str) -> Self {
        let mut hasher = MetroHash64::default();
        hasher.write(contents.as_bytes());
        ContentFingerprint(hasher.finish())
    }
}
