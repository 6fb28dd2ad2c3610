use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use compio::fs;
use hashlink::LinkedHashMap;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::config::DependencySettings;
use crate::ext::{BestEffortPathExt, normalize_path};

const INSTALLED_MANIFESTS: [&str; 2] = [".bower.json", "bower.json"];

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MainFiles {
    One(String),
    Many(Vec<String>),
}

impl MainFiles {
    fn into_vec(self) -> Vec<String> {
        match self {
            MainFiles::One(file) => vec![file],
            MainFiles::Many(files) => files,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    main: Option<MainFiles>,
    #[serde(default)]
    dependencies: LinkedHashMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: LinkedHashMap<String, serde_json::Value>,
}

/// Lists the main files of installed third-party packages, dependencies
/// before their dependents.
pub struct DependencyResolver<'a> {
    settings: &'a DependencySettings,
    root: &'a Path,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(settings: &'a DependencySettings, root: &'a Path) -> Self {
        Self { settings, root }
    }

    /// Returned paths are relative to the project root. A project without a
    /// manifest has no third-party files.
    pub async fn resolve(&self) -> Result<Vec<PathBuf>, DependencyError> {
        let manifest_path = self.root.join(&self.settings.manifest);
        let Some(root_manifest) = read_manifest(&manifest_path).await? else {
            debug!("No manifest at {}, no third-party files", manifest_path.display());
            return Ok(Vec::new());
        };

        let mut direct: Vec<String> = root_manifest.dependencies.keys().cloned().collect();
        if self.settings.include_dev {
            direct.extend(root_manifest.dev_dependencies.keys().cloned());
        }

        let mut packages = HashMap::new();
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<(String, bool)> =
            direct.into_iter().rev().map(|name| (name, false)).collect();

        while let Some((name, expanded)) = stack.pop() {
            if expanded {
                order.push(name);
                continue;
            }
            if !visited.insert(name.clone()) {
                continue;
            }

            let package = self.read_package(&name).await?;
            stack.push((name.clone(), true));
            for dependency in package.dependencies.keys().rev() {
                if !visited.contains(dependency) {
                    stack.push((dependency.clone(), false));
                }
            }
            packages.insert(name, package);
        }

        let mut files = Vec::new();
        for name in order {
            let main = match self.settings.overrides.get(&name) {
                Some(files) => files.clone(),
                None => packages
                    .remove(&name)
                    .and_then(|package| package.main)
                    .map(MainFiles::into_vec)
                    .unwrap_or_default(),
            };
            if main.is_empty() {
                debug!("Package {} declares no main files", name);
            }

            for file in main {
                let path = self.package_dir(&name).join(&file);
                if !self.has_wanted_extension(&path) {
                    continue;
                }
                if !self.root.join(&path).is_file() {
                    warn!("Main file {} of package {} does not exist", file, name);
                    continue;
                }
                let relative = self.relative_to_root(&path);
                if !files.contains(&relative) {
                    files.push(relative);
                }
            }
        }

        Ok(files)
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        self.settings.directory.join(name)
    }

    async fn read_package(&self, name: &str) -> Result<Manifest, DependencyError> {
        let dir = self.root.join(self.package_dir(name));
        if !dir.is_dir() {
            return MissingPackageSnafu {
                name,
                directory: self.settings.directory.best_effort_path_display(),
            }
            .fail();
        }

        for manifest in INSTALLED_MANIFESTS {
            if let Some(package) = read_manifest(&dir.join(manifest)).await? {
                return Ok(package);
            }
        }

        warn!("Package {} has no manifest, it contributes no files", name);
        Ok(Manifest::default())
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.settings.extensions.iter().any(|wanted| wanted == ext))
    }

    fn relative_to_root(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            let root = normalize_path(self.root);
            let path = normalize_path(path);
            pathdiff::diff_paths(&path, &root).unwrap_or(path)
        } else {
            normalize_path(path)
        }
    }
}

async fn read_manifest(path: &Path) -> Result<Option<Manifest>, DependencyError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).context(ReadManifestSnafu {
                path: path.best_effort_path_display(),
            });
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .context(ParseManifestSnafu {
            path: path.best_effort_path_display(),
        })
}

#[derive(Debug, Snafu)]
pub enum DependencyError {
    #[snafu(display("Failed to read manifest {}", path))]
    ReadManifestError { path: String, source: io::Error },
    #[snafu(display("Invalid manifest {}: {}", path, source))]
    ParseManifestError {
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("Package {} is not installed in {}", name, directory))]
    MissingPackageError { name: String, directory: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> DependencySettings {
        DependencySettings {
            manifest: "bower.json".into(),
            directory: "bower_components".into(),
            extensions: vec!["js".to_string()],
            include_dev: false,
            overrides: LinkedHashMap::new(),
        }
    }

    fn write(dir: &TempDir, path: &str, contents: &str) {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn package(dir: &TempDir, name: &str, manifest: &str, files: &[&str]) {
        write(dir, &format!("bower_components/{name}/.bower.json"), manifest);
        for file in files {
            write(dir, &format!("bower_components/{name}/{file}"), file);
        }
    }

    #[compio::test]
    async fn missing_root_manifest_means_no_files() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let settings = settings();

        let files = DependencyResolver::new(&settings, dir.path()).resolve().await.unwrap();
        assert!(files.is_empty());
    }

    #[compio::test]
    async fn dependencies_come_before_dependents() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(&dir, "bower.json", r#"{"dependencies": {"app-lib": "*", "jquery": "*"}}"#);
        package(
            &dir,
            "app-lib",
            r#"{"main": ["dist/lib.js", "dist/lib.css"], "dependencies": {"jquery": "*"}}"#,
            &["dist/lib.js", "dist/lib.css"],
        );
        package(&dir, "jquery", r#"{"main": "./dist/jquery.js"}"#, &["dist/jquery.js"]);
        let settings = settings();

        let files = DependencyResolver::new(&settings, dir.path()).resolve().await.unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("bower_components/jquery/dist/jquery.js"),
                PathBuf::from("bower_components/app-lib/dist/lib.js"),
            ]
        );
    }

    #[compio::test]
    async fn cycles_are_broken() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(&dir, "bower.json", r#"{"dependencies": {"a": "*"}}"#);
        package(&dir, "a", r#"{"main": "a.js", "dependencies": {"b": "*"}}"#, &["a.js"]);
        package(&dir, "b", r#"{"main": "b.js", "dependencies": {"a": "*"}}"#, &["b.js"]);
        let settings = settings();

        let files = DependencyResolver::new(&settings, dir.path()).resolve().await.unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("bower_components/b/b.js"),
                PathBuf::from("bower_components/a/a.js"),
            ]
        );
    }

    #[compio::test]
    async fn overrides_and_dev_dependencies() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(
            &dir,
            "bower.json",
            r#"{"dependencies": {"a": "*"}, "devDependencies": {"test-kit": "*"}}"#,
        );
        package(&dir, "a", r#"{"main": "a.js"}"#, &["a.js", "a.min.js"]);
        package(&dir, "test-kit", r#"{"main": "kit.js"}"#, &["kit.js"]);
        let mut settings = settings();
        settings.include_dev = true;
        settings.overrides.insert("a".to_string(), vec!["a.min.js".to_string()]);

        let files = DependencyResolver::new(&settings, dir.path()).resolve().await.unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("bower_components/a/a.min.js"),
                PathBuf::from("bower_components/test-kit/kit.js"),
            ]
        );
    }

    #[compio::test]
    async fn uninstalled_package_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(&dir, "bower.json", r#"{"dependencies": {"ghost": "*"}}"#);
        let settings = settings();

        let error = DependencyResolver::new(&settings, dir.path())
            .resolve()
            .await
            .unwrap_err();
        assert!(matches!(error, DependencyError::MissingPackageError { ref name, .. } if name == "ghost"));
    }

    #[compio::test]
    async fn broken_manifest_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        write(&dir, "bower.json", "{ not json");
        let settings = settings();

        let error = DependencyResolver::new(&settings, dir.path())
            .resolve()
            .await
            .unwrap_err();
        assert!(matches!(error, DependencyError::ParseManifestError { .. }));
    }
}
