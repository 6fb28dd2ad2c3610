//! In-process memory shared by consecutive pipeline runs.

mod fingerprint;
mod recombination_store;
mod unchanged_cache;

pub use fingerprint::ContentFingerprint;
pub use recombination_store::RecombinationStore;
pub use unchanged_cache::UnchangedCache;
