mod options;
pub mod path_config;
mod project_file;
mod setting;

pub use options::{DependencySettings, EffectiveOptions, ReloadSettings, SetupError, ToolSettings};
pub use path_config::{ConfigError, ValidPathConfig};
pub use project_file::{PROJECT_FILE_NAME, ProjectFile, ProjectFileError};
pub use setting::{Setting, SettingError};
