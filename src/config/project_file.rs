use std::path::{Path, PathBuf};

use compio::fs;
use snafu::prelude::*;
use tracing::debug;

use crate::config::{Setting, SettingError};
use crate::ext::BestEffortPathExt;

pub const PROJECT_FILE_NAME: &str = "scriptpipe.yaml";

/// The `paths` and `config` sections of a project file, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    paths: Setting,
    overrides: Option<Setting>,
}

impl ProjectFile {
    pub async fn read(path: &Path) -> Result<Self, ProjectFileError> {
        Self::from_path(path.to_path_buf()).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, ProjectFileError> {
        debug!("Reading project file: {}", path.best_effort_path_display());
        let bytes = fs::read(&path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read project file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).map_err(|_| ProjectFileError::EncodingError {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    pub fn paths(&self) -> &Setting {
        &self.paths
    }

    pub fn overrides(&self) -> Option<&Setting> {
        self.overrides.as_ref()
    }
}

impl TryFrom<&str> for ProjectFile {
    type Error = ProjectFileError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let document = Setting::parse_document(contents)
            .context(ParseSnafu)?
            .ok_or(ProjectFileError::MalformedError)?;

        ensure!(document.as_mapping().is_some(), TopLevelNotMapSnafu);

        let paths = document.get("paths").cloned().unwrap_or_default();
        let overrides = document.get("config").cloned();

        Ok(ProjectFile { paths, overrides })
    }
}

#[derive(Debug, Snafu)]
pub enum ProjectFileError {
    #[snafu(display("Failed to read the project file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The project file is not valid UTF-8: {}", file_path))]
    EncodingError { file_path: String },
    #[snafu(display("Failed to parse the project file"))]
    ParseError { source: SettingError },
    #[snafu(display("Improperly formatted project file"))]
    MalformedError,
    #[snafu(display("Top level of the project file should be a map"))]
    TopLevelNotMapError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[compio::test]
    async fn returns_error_on_nonexistent_file() {
        let result = ProjectFile::from_path(PathBuf::from("nonexistent.yaml")).await;
        assert!(matches!(result, Err(ProjectFileError::ReadError { .. })));
    }

    #[compio::test]
    async fn reads_file_from_disk() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join(PROJECT_FILE_NAME);
        std::fs::write(&path, "paths:\n  src: a.js\n").expect("Failed to write project file");

        let project = ProjectFile::read(&path).await.expect("Failed to read project file");
        assert_eq!(
            project.paths().get("src"),
            Some(&Setting::String("a.js".to_string()))
        );
        assert_eq!(project.overrides(), None);
    }

    #[test]
    fn returns_error_on_invalid_yaml() {
        let result: Result<ProjectFile, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ProjectFileError::ParseError { .. })));
    }

    #[test]
    fn returns_error_on_empty_file() {
        let result: Result<ProjectFile, _> = "".try_into();
        assert!(matches!(result, Err(ProjectFileError::MalformedError)));
    }

    #[test]
    fn returns_error_when_top_level_is_not_map() {
        let result: Result<ProjectFile, _> = "- item1\n- item2".try_into();
        assert!(matches!(result, Err(ProjectFileError::TopLevelNotMapError)));

        let result: Result<ProjectFile, _> = "just a string".try_into();
        assert!(matches!(result, Err(ProjectFileError::TopLevelNotMapError)));
    }

    #[test]
    fn missing_paths_section_is_left_to_validation() {
        let project: ProjectFile = "config: {}".try_into().unwrap();
        assert_eq!(project.paths(), &Setting::Null);
        assert!(project.overrides().is_some());
    }

    #[test]
    fn splits_paths_and_config_sections() {
        let project: ProjectFile = r#"
paths:
  src: [src/**/*.js]
  dest:
    dev: build/app.js
    dist: dist/app.js
config:
  lint:
    command: jshint
"#
        .try_into()
        .unwrap();

        assert!(project.paths().get("dest").is_some());
        assert_eq!(
            project
                .overrides()
                .and_then(|c| c.get("lint"))
                .and_then(|l| l.get("command")),
            Some(&Setting::String("jshint".to_string()))
        );
    }
}
