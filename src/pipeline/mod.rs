//! The script pipeline: stage list, per-run mode and the orchestrator that
//! drives files through the active stages.

mod error;
mod file_set;
mod orchestrator;
mod run_mode;
mod sourcemap;
mod stage;

pub use error::{ErrorKind, StageError};
pub use file_set::{Artifact, FileRecord, FileSet, Origin};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use run_mode::{BuildFlags, Environment, RunMode};
pub use sourcemap::SourceMap;
pub use stage::{Pipeline, StageKind};
