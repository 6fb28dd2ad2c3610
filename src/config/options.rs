use std::path::PathBuf;

use hashlink::LinkedHashMap;
use snafu::prelude::*;

use crate::config::{ConfigError, Setting, SettingError, ValidPathConfig, path_config};

/// Merge base for every project. User overrides under `config:` are merged on top.
pub const DEFAULTS: &str = r#"
lint:
  command: ~
  options:
    esversion: 6
    laxbreak: true
    "-W086": true
    "-W027": true
transpile:
  command: ~
  options:
    presets: [es2015]
minify:
  command: ~
  options: {}
errors:
  notify: true
reload:
  command: ~
  reload_command: ~
  options: {}
dependencies:
  manifest: bower.json
  directory: bower_components
  extensions: [js]
  include_dev: false
  overrides: {}
"#;

pub fn default_settings() -> Result<Setting, SettingError> {
    Ok(Setting::parse_document(DEFAULTS)?.unwrap_or_default())
}

/// Validated, merged configuration. Built once by [`EffectiveOptions::new`]
/// and read-only afterwards.
#[derive(Debug, Clone)]
pub struct EffectiveOptions {
    pub paths: ValidPathConfig,
    pub lint: ToolSettings,
    pub transpile: ToolSettings,
    pub minify: ToolSettings,
    pub errors: ErrorPipe,
    pub reload: ReloadSettings,
    pub dependencies: DependencySettings,
    merged: Setting,
}

impl EffectiveOptions {
    /// Validates `paths` and merges `overrides` over the built-in defaults.
    pub fn new(paths: &Setting, overrides: Option<&Setting>) -> Result<Self, SetupError> {
        let paths = path_config::validate(paths).context(InvalidPathsSnafu)?;

        let overrides = match overrides {
            None | Some(Setting::Null) => Setting::Mapping(LinkedHashMap::new()),
            Some(mapping @ Setting::Mapping(_)) => mapping.clone(),
            Some(_) => return OverridesNotMapSnafu.fail(),
        };
        let merged = default_settings()
            .context(DefaultsSnafu)?
            .merged_with(overrides);

        Ok(Self {
            paths,
            lint: ToolSettings::from_section(&merged, "lint"),
            transpile: ToolSettings::from_section(&merged, "transpile"),
            minify: ToolSettings::from_section(&merged, "minify"),
            errors: ErrorPipe::from_section(&merged),
            reload: ReloadSettings::from_section(&merged),
            dependencies: DependencySettings::from_section(&merged),
            merged,
        })
    }

    /// The full merged settings tree.
    pub fn merged(&self) -> &Setting {
        &self.merged
    }
}

/// An external black-box tool: an optional shell command plus options passed
/// through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolSettings {
    pub command: Option<String>,
    pub options: Setting,
}

impl ToolSettings {
    fn from_section(merged: &Setting, section: &str) -> Self {
        let section = merged.get(section);
        Self {
            command: command_at(section, "command"),
            options: options_at(section),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReloadSettings {
    pub command: Option<String>,
    pub reload_command: Option<String>,
    pub options: Setting,
}

impl ReloadSettings {
    fn from_section(merged: &Setting) -> Self {
        let section = merged.get("reload");
        Self {
            command: command_at(section, "command"),
            reload_command: command_at(section, "reload_command"),
            options: options_at(section),
        }
    }
}

/// Settings handed to the fail-safe wrapper around each pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPipe {
    pub notify: bool,
}

impl ErrorPipe {
    fn from_section(merged: &Setting) -> Self {
        Self {
            notify: merged
                .get("errors")
                .and_then(|errors| errors.get("notify"))
                .and_then(Setting::as_bool)
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySettings {
    pub manifest: PathBuf,
    pub directory: PathBuf,
    pub extensions: Vec<String>,
    pub include_dev: bool,
    pub overrides: LinkedHashMap<String, Vec<String>>,
}

impl DependencySettings {
    fn from_section(merged: &Setting) -> Self {
        let section = merged.get("dependencies");
        let string_at = |key: &str, default: &str| {
            section
                .and_then(|s| s.get(key))
                .and_then(Setting::as_str)
                .unwrap_or(default)
                .to_string()
        };

        let overrides = section
            .and_then(|s| s.get("overrides"))
            .and_then(Setting::as_mapping)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(name, entry)| {
                        let main = entry.get("main")?.as_string_list()?;
                        Some((name.clone(), main))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            manifest: string_at("manifest", "bower.json").into(),
            directory: string_at("directory", "bower_components").into(),
            extensions: section
                .and_then(|s| s.get("extensions"))
                .and_then(Setting::as_string_list)
                .unwrap_or_else(|| vec!["js".to_string()]),
            include_dev: section
                .and_then(|s| s.get("include_dev"))
                .and_then(Setting::as_bool)
                .unwrap_or(false),
            overrides,
        }
    }
}

fn command_at(section: Option<&Setting>, key: &str) -> Option<String> {
    section
        .and_then(|s| s.get(key))
        .and_then(Setting::as_str)
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .map(str::to_string)
}

fn options_at(section: Option<&Setting>) -> Setting {
    section
        .and_then(|s| s.get("options"))
        .cloned()
        .unwrap_or_else(|| Setting::Mapping(LinkedHashMap::new()))
}

#[derive(Debug, Snafu)]
pub enum SetupError {
    #[snafu(display("{}", source))]
    InvalidPathsError { source: ConfigError },
    #[snafu(display("The config section should be a map"))]
    OverridesNotMapError,
    #[snafu(display("Built-in defaults could not be parsed"))]
    DefaultsError { source: SettingError },
}
