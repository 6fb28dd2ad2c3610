use std::path::PathBuf;

use derive_more::Display;
use snafu::Snafu;

use crate::pipeline::StageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[display("LintError")]
    Lint,
    #[display("TransformError")]
    Transform,
    #[display("FileSystemError")]
    FileSystem,
    #[display("DependencyError")]
    Dependency,
}

/// Failure of a single stage. Formatted for people only by the run's error
/// hook.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("{kind} in {stage}: {message}"))]
pub struct StageError {
    pub kind: ErrorKind,
    pub stage: StageKind,
    pub message: String,
    pub file: Option<PathBuf>,
    pub cause: Option<String>,
}

impl StageError {
    pub fn new(kind: ErrorKind, stage: StageKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            file: None,
            cause: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_cause(mut self, cause: impl ToString) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}
