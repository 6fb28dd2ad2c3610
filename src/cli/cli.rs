use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;
use crate::commands::DEFAULT;
use crate::config::PROJECT_FILE_NAME;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Builds script bundles described by a scriptpipe.yaml file")]
pub struct Cli {
    /// The command to run: compile, default or watch
    #[clap(default_value = DEFAULT)]
    pub target: String,
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// The root directory of the project
    #[clap(long, short, default_value = ".")]
    pub root: PathBuf,

    /// The project file, relative to the root
    #[clap(long, short, default_value = PROJECT_FILE_NAME)]
    pub config: PathBuf,

    /// Build for production: concatenate, minify and write to the dist path
    #[clap(long, visible_aliases = ["distribution", "distro", "dist"])]
    pub production: bool,

    /// Emit source maps outside of development builds
    #[clap(long)]
    pub sourcemaps: bool,

    /// Leave out third-party dependency files
    #[clap(long)]
    pub solo: bool,
}
