use std::path::{Path, PathBuf};
use std::process::Stdio;

use compio::process::Child;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::config::ReloadSettings;
use crate::tools::shell::{combined_output, shell_command};

/// The browser-reload companion. Started once when watching begins and kept
/// alive for the rest of the process.
pub struct LiveReload {
    settings: ReloadSettings,
    root: PathBuf,
    companion: Option<Child>,
}

impl LiveReload {
    pub fn start(settings: &ReloadSettings, root: &Path) -> Result<Self, LiveReloadError> {
        let companion = match &settings.command {
            Some(command) => {
                let mut cmd = shell_command(command, None, root, &settings.options);
                let _ = cmd.stdout(Stdio::inherit());
                let _ = cmd.stderr(Stdio::inherit());
                let child = cmd.spawn().context(SpawnSnafu { command })?;
                info!("Started live reload companion '{}'", command);
                Some(child)
            }
            None => {
                debug!("No live reload companion configured");
                None
            }
        };

        Ok(Self {
            settings: settings.clone(),
            root: root.to_path_buf(),
            companion,
        })
    }

    pub fn is_running(&self) -> bool {
        self.companion.is_some()
    }

    /// Tells connected browsers to reload.
    pub async fn reload(&self) -> Result<(), LiveReloadError> {
        let Some(command) = &self.settings.reload_command else {
            info!("Outputs changed, reload requested");
            return Ok(());
        };

        let output = shell_command(command, None, &self.root, &self.settings.options)
            .output()
            .await
            .context(SpawnSnafu { command })?;

        if output.status.success() {
            debug!("Reload command '{}' finished", command);
            Ok(())
        } else {
            ReloadSnafu {
                command,
                output: combined_output(&output.stdout, &output.stderr),
            }
            .fail()
        }
    }
}

impl Drop for LiveReload {
    fn drop(&mut self) {
        if let Some(mut companion) = self.companion.take() {
            if let Err(err) = companion.kill() {
                warn!("Failed to stop live reload companion: {}", err);
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum LiveReloadError {
    #[snafu(display("Failed to spawn live reload command '{}'", command))]
    SpawnError {
        command: String,
        source: std::io::Error,
    },
    #[snafu(display("Reload command '{}' failed: {}", command, output))]
    ReloadError { command: String, output: String },
}
