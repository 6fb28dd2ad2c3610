use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::SourceMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Own,
    ThirdParty,
}

/// One file flowing through the pipeline. `path` is relative to the project
/// root; `original` is the content as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub contents: String,
    pub original: Arc<str>,
    pub origin: Origin,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, contents: String, origin: Origin) -> Self {
        Self {
            path: path.into(),
            original: Arc::from(contents.as_str()),
            contents,
            origin,
        }
    }
}

/// The concatenated output of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub contents: String,
    pub source_map: Option<SourceMap>,
    /// File name and JSON of the map written next to the artifact.
    pub map_file: Option<(String, String)>,
}

/// State of one pipeline run.
///
/// Between the filter and restore stages `files` holds own source only and
/// third-party files wait in `held_back`.
#[derive(Debug, Default)]
pub struct FileSet {
    pub files: Vec<FileRecord>,
    pub held_back: Vec<FileRecord>,
    pub admitted: Vec<PathBuf>,
    pub sourcemaps: bool,
    pub artifact: Option<Artifact>,
}
