use std::path::PathBuf;

use crate::cli::Cli;
use crate::pipeline::BuildFlags;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub target: String,
    pub root: PathBuf,
    pub project_file: PathBuf,
    pub flags: BuildFlags,
}

impl RuntimeConfig {
    pub fn project_file_path(&self) -> PathBuf {
        self.root.join(&self.project_file)
    }
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            target: cli.target,
            root: cli.root,
            project_file: cli.config,
            flags: BuildFlags {
                production: cli.production,
                sourcemaps: cli.sourcemaps,
                solo: cli.solo,
            },
        }
    }
}
