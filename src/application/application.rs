use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::commands::{self, CommandError};
use crate::config::{ProjectFile, ProjectFileError, SetupError};
use crate::ext::BestEffortPathExt;
use crate::tools::TerminalNotifier;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        ensure!(
            app_config.root.is_dir(),
            RootSnafu {
                root: app_config.root.best_effort_path_display(),
            }
        );

        let project = ProjectFile::read(&app_config.project_file_path())
            .await
            .context(ProjectFileSnafu)?;
        debug!("Loaded project file: {:?}", project);

        let registry = commands::setup(project.paths(), project.overrides()).context(SetupSnafu)?;
        info!("Registered commands: {}", registry.names().join(", "));

        registry
            .run(
                &app_config.target,
                &app_config.root,
                app_config.flags,
                TerminalNotifier,
            )
            .await
            .context(CommandSnafu)?;

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Project root {} is not a directory", root))]
    RootError { root: String },
    #[snafu(display("Critical failure encountered while reading the project file"))]
    ProjectFileError { source: ProjectFileError },
    #[snafu(display("Critical failure encountered during setup"))]
    SetupError { source: SetupError },
    #[snafu(display("Critical failure encountered while running a command"))]
    CommandError { source: CommandError },
}

#[cfg(all(test, target_family = "unix"))]
mod tests {
    use super::*;
    use crate::pipeline::BuildFlags;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(root: &std::path::Path, target: &str, flags: BuildFlags) -> RuntimeConfig {
        RuntimeConfig {
            target: target.to_string(),
            root: root.to_path_buf(),
            project_file: PathBuf::from("scriptpipe.yaml"),
            flags,
        }
    }

    fn write(dir: &TempDir, path: &str, contents: &str) {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[compio::test]
    async fn production_compile_end_to_end() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(
            &dir,
            "scriptpipe.yaml",
            "paths:\n  src: [js/*.js]\n  build:\n    dev: out/dev.js\n    prod: out/app.js\n",
        );
        write(&dir, "js/a.js", "a();");
        let flags = BuildFlags {
            production: true,
            ..BuildFlags::default()
        };

        Application::run(config(dir.path(), "compile", flags))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("out/app.js")).unwrap(), "a();");
        assert!(!dir.path().join("out/dev.js").exists());
    }

    #[compio::test]
    async fn missing_project_file_is_fatal() {
        let dir = TempDir::new().expect("Failed to create temp directory");

        let error = Application::run(config(dir.path(), "default", BuildFlags::default()))
            .await
            .unwrap_err();
        assert!(matches!(error, ApplicationError::ProjectFileError { .. }));
    }

    #[compio::test]
    async fn invalid_paths_are_fatal_before_any_run() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(
            &dir,
            "scriptpipe.yaml",
            "paths:\n  src: js/*.js\n  dest:\n    dev: /tmp/dev.js\n    dist: out/app.js\n",
        );

        let error = Application::run(config(dir.path(), "default", BuildFlags::default()))
            .await
            .unwrap_err();
        assert!(matches!(error, ApplicationError::SetupError { .. }));
        assert!(!dir.path().join("out").exists());
    }

    #[compio::test]
    async fn unknown_target_is_fatal() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(
            &dir,
            "scriptpipe.yaml",
            "paths:\n  src: js/*.js\n  dest:\n    dev: out/dev.js\n    dist: out/app.js\n",
        );

        let error = Application::run(config(dir.path(), "deploy", BuildFlags::default()))
            .await
            .unwrap_err();
        assert!(matches!(error, ApplicationError::CommandError { .. }));
    }
}
