use std::path::{Path, PathBuf};

use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::config::ToolSettings;
use crate::ext::BestEffortPathExt;
use crate::filesystem::STATE_DIR;
use crate::tools::shell::{combined_output, shell_command};

const STAGING_DIR: &str = "staging";

/// A black-box tool driven through its configured shell command.
///
/// Without a command the tool is a pass-through: checks succeed and
/// transforms return their input.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    name: &'static str,
    settings: ToolSettings,
    root: PathBuf,
}

impl ExternalTool {
    pub fn new(name: &'static str, settings: &ToolSettings, root: &Path) -> Self {
        Self {
            name,
            settings: settings.clone(),
            root: root.to_path_buf(),
        }
    }

    /// Runs the tool against `file`, which is relative to the project root.
    /// A non-zero exit is a failure.
    pub async fn check(&self, file: &Path) -> Result<(), ToolError> {
        let Some(command) = &self.settings.command else {
            debug!("No {} command configured, skipping {}", self.name, file.display());
            return Ok(());
        };

        self.run(command, file).await?;
        Ok(())
    }

    /// Feeds `contents` to the tool through a staged copy named `name` and
    /// returns what the tool prints.
    pub async fn transform(&self, name: &Path, contents: &str) -> Result<String, ToolError> {
        let Some(command) = &self.settings.command else {
            debug!("No {} command configured, passing {} through", self.name, name.display());
            return Ok(contents.to_string());
        };

        let staged = self.stage(name, contents).await?;
        let stdout = self.run(command, &staged).await?;

        String::from_utf8(stdout).map_err(|_| ToolError::OutputEncodingError {
            tool: self.name.to_string(),
            command: command.clone(),
        })
    }

    async fn stage(&self, name: &Path, contents: &str) -> Result<PathBuf, ToolError> {
        let staged = Path::new(STATE_DIR).join(STAGING_DIR).join(name);
        let absolute = self.root.join(&staged);

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await.context(StagingSnafu {
                path: parent.best_effort_path_display(),
            })?;
        }
        fs::write(&absolute, contents.as_bytes().to_vec())
            .await
            .0
            .context(StagingSnafu {
                path: absolute.best_effort_path_display(),
            })?;

        Ok(staged)
    }

    async fn run(&self, command: &str, file: &Path) -> Result<Vec<u8>, ToolError> {
        debug!("Running {} command '{}' on {}", self.name, command, file.display());

        let output = shell_command(command, Some(file), &self.root, &self.settings.options)
            .output()
            .await
            .context(SpawnSnafu {
                tool: self.name.to_string(),
                command: command.to_string(),
            })?;

        if output.status.success() {
            info!("{} finished for {}", self.name, file.display());
            Ok(output.stdout)
        } else {
            UnsuccessfulExecutionSnafu {
                tool: self.name.to_string(),
                command: command.to_string(),
                status: output.status.code().unwrap_or(-1),
                output: combined_output(&output.stdout, &output.stderr),
            }
            .fail()
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ToolError {
    #[snafu(display("Failed to spawn {} command '{}'", tool, command))]
    SpawnError {
        tool: String,
        command: String,
        source: std::io::Error,
    },
    #[snafu(display("{} command '{}' failed with exit code {}", tool, command, status))]
    UnsuccessfulExecution {
        tool: String,
        command: String,
        status: i32,
        output: String,
    },
    #[snafu(display("{} command '{}' printed invalid UTF-8", tool, command))]
    OutputEncodingError { tool: String, command: String },
    #[snafu(display("Failed to stage a file at {}", path))]
    StagingError {
        path: String,
        source: std::io::Error,
    },
}

impl ToolError {
    /// What the tool itself reported, if it ran at all.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            ToolError::UnsuccessfulExecution { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

#[cfg(all(test, target_family = "unix"))]
mod tests {
    use super::*;
    use crate::config::Setting;
    use tempfile::TempDir;

    fn tool(command: Option<&str>, root: &Path) -> ExternalTool {
        ExternalTool::new(
            "test",
            &ToolSettings {
                command: command.map(str::to_string),
                options: Setting::Null,
            },
            root,
        )
    }

    #[compio::test]
    async fn unconfigured_tool_passes_through() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let tool = tool(None, dir.path());

        assert!(tool.check(Path::new("a.js")).await.is_ok());
        assert_eq!(
            tool.transform(Path::new("a.js"), "let a;").await.unwrap(),
            "let a;"
        );
    }

    #[compio::test]
    async fn transform_prints_staged_copy() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let tool = tool(Some("tr a-z A-Z <"), dir.path());

        let output = tool
            .transform(Path::new("src/a.js"), "let a;")
            .await
            .expect("transform should succeed");

        assert_eq!(output, "LET A;");
        assert!(dir.path().join(".scriptpipe/staging/src/a.js").is_file());
    }

    #[compio::test]
    async fn failing_check_reports_output() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let tool = tool(Some("echo \"bad file:\""), dir.path());
        let failing = self::tool(Some("sh -c 'echo broken \"$0\"; exit 3'"), dir.path());

        assert!(tool.check(Path::new("a.js")).await.is_ok());

        let error = failing.check(Path::new("a.js")).await.unwrap_err();
        match &error {
            ToolError::UnsuccessfulExecution { status, .. } => assert_eq!(*status, 3),
            other => panic!("Expected UnsuccessfulExecution, got {other:?}"),
        }
        assert_eq!(error.tool_output(), Some("broken a.js"));
    }

    #[compio::test]
    async fn options_are_exported_as_json() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let options = Setting::parse_document("esversion: 6\n").unwrap().unwrap();
        let tool = ExternalTool::new(
            "test",
            &ToolSettings {
                command: Some("printf '%s' \"$SCRIPTPIPE_OPTIONS\" #".to_string()),
                options,
            },
            dir.path(),
        );

        let output = tool.transform(Path::new("a.js"), "").await.unwrap();
        assert_eq!(output, "{\"esversion\":6}");
    }
}
