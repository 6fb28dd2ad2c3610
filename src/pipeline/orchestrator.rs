use std::path::{Path, PathBuf};
use std::sync::Arc;

use compio::fs;
use tracing::{debug, error, info};

use crate::cache::{RecombinationStore, UnchangedCache};
use crate::config::EffectiveOptions;
use crate::filesystem::{PatternError, SourcePatterns};
use crate::pipeline::sourcemap;
use crate::pipeline::{
    BuildFlags, Environment, ErrorKind, FileRecord, FileSet, Origin, Pipeline, RunMode,
    StageError, StageKind,
};
use crate::tools::{DependencyResolver, ExternalTool, Notification, Notifier, ToolError};

/// Name of the unchanged-file cache and the recombination store.
pub const CACHE_NAME: &str = "scripts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(Environment),
    Failed(StageError),
}

/// Runs the script pipeline. Caches live as long as the orchestrator, so
/// consecutive runs in watch mode only reprocess what changed.
pub struct Orchestrator<N: Notifier> {
    options: Arc<EffectiveOptions>,
    root: PathBuf,
    flags: BuildFlags,
    pipeline: Pipeline,
    sources: SourcePatterns,
    lint: ExternalTool,
    transpile: ExternalTool,
    minify: ExternalTool,
    notifier: N,
    unchanged: UnchangedCache,
    remembered: RecombinationStore<FileRecord>,
}

impl<N: Notifier> Orchestrator<N> {
    pub fn new(
        options: Arc<EffectiveOptions>,
        root: &Path,
        flags: BuildFlags,
        notifier: N,
    ) -> Result<Self, PatternError> {
        let sources = SourcePatterns::new(options.paths.src().patterns())?;

        Ok(Self {
            lint: ExternalTool::new("lint", &options.lint, root),
            transpile: ExternalTool::new("transpile", &options.transpile, root),
            minify: ExternalTool::new("minify", &options.minify, root),
            options,
            root: root.to_path_buf(),
            flags,
            pipeline: Pipeline::scripts(),
            sources,
            notifier,
            unchanged: UnchangedCache::default(),
            remembered: RecombinationStore::default(),
        })
    }

    pub fn options(&self) -> &EffectiveOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn flags(&self) -> BuildFlags {
        self.flags
    }

    pub fn sources(&self) -> &SourcePatterns {
        &self.sources
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Runs every active stage in order. A failing stage ends the run; it is
    /// reported through the notifier and never propagated.
    pub async fn compile(&mut self) -> RunOutcome {
        let mode = RunMode::resolve(&self.flags);
        let stages: Vec<StageKind> = self.pipeline.active_stages(mode).collect();
        info!("Compiling scripts for {}", mode.environment());
        debug!("Active stages: {:?}", stages);

        let mut files = FileSet::default();
        for stage in stages {
            if let Err(error) = self.apply(stage, mode, &mut files).await {
                return self.fail(error, &files);
            }
        }

        RunOutcome::Completed(mode.environment())
    }

    /// Evicts a deleted file from both caches. Returns whether anything was
    /// remembered for it.
    pub fn forget(&mut self, path: &Path) -> bool {
        let cached = self.unchanged.forget(CACHE_NAME, path);
        let remembered = self.remembered.forget(CACHE_NAME, path);
        if cached || remembered {
            debug!("Evicted {} from caches", path.display());
        }
        cached || remembered
    }

    #[cfg(test)]
    fn is_cached(&self, path: &Path) -> bool {
        self.unchanged.contains(CACHE_NAME, path) || self.remembered.contains(CACHE_NAME, path)
    }

    async fn apply(
        &mut self,
        stage: StageKind,
        mode: RunMode,
        files: &mut FileSet,
    ) -> Result<(), StageError> {
        debug!("Running stage {} on {} files", stage, files.files.len());

        match stage {
            StageKind::Collect => self.collect(files).await,
            StageKind::FilterOwnSource => {
                let (own, third_party) = std::mem::take(&mut files.files)
                    .into_iter()
                    .partition(|file| file.origin == Origin::Own);
                files.files = own;
                files.held_back = third_party;
                Ok(())
            }
            StageKind::InitSourcemaps => {
                files.sourcemaps = true;
                Ok(())
            }
            StageKind::SkipUnchanged => {
                let unchanged = &mut self.unchanged;
                let admitted = &mut files.admitted;
                files.files.retain(|file| {
                    let changed = unchanged.admit(CACHE_NAME, &file.path, &file.contents);
                    if changed {
                        admitted.push(file.path.clone());
                    }
                    changed
                });
                Ok(())
            }
            StageKind::Lint => {
                for file in &files.files {
                    self.lint
                        .check(&file.path)
                        .await
                        .map_err(|err| tool_failure(ErrorKind::Lint, stage, &file.path, err))?;
                }
                Ok(())
            }
            StageKind::Transpile => {
                for file in &mut files.files {
                    file.contents = self
                        .transpile
                        .transform(&file.path, &file.contents)
                        .await
                        .map_err(|err| tool_failure(ErrorKind::Transform, stage, &file.path, err))?;
                }
                Ok(())
            }
            StageKind::Recombine => {
                for file in &files.files {
                    self.remembered.remember(CACHE_NAME, &file.path, file.clone());
                }
                files.files = self.remembered.recall(CACHE_NAME);
                Ok(())
            }
            StageKind::RestoreThirdParty => {
                let mut restored = std::mem::take(&mut files.held_back);
                restored.append(&mut files.files);
                files.files = restored;
                Ok(())
            }
            StageKind::ConcatProduction => {
                self.concat(&self.options.paths.dest().dist, files);
                Ok(())
            }
            StageKind::ConcatDevelopment => {
                self.concat(&self.options.paths.dest().dev, files);
                Ok(())
            }
            StageKind::Minify => {
                if let Some(artifact) = &mut files.artifact {
                    let name = PathBuf::from(&artifact.name);
                    artifact.contents = self
                        .minify
                        .transform(&name, &artifact.contents)
                        .await
                        .map_err(|err| tool_failure(ErrorKind::Transform, stage, &name, err))?;
                }
                Ok(())
            }
            StageKind::WriteSourcemaps => write_sourcemap(stage, files),
            StageKind::WriteProduction => {
                self.write(stage, &self.options.paths.dest().dist, files)
                    .await
            }
            StageKind::WriteDevelopment => {
                self.write(stage, &self.options.paths.dest().dev, files)
                    .await
            }
            StageKind::Notify => {
                self.notifier
                    .notify(&Notification::compiled(mode.environment()));
                Ok(())
            }
        }
    }

    /// Third-party files first, unless in solo mode, then own source.
    async fn collect(&self, files: &mut FileSet) -> Result<(), StageError> {
        let third_party = if self.flags.solo {
            debug!("Solo mode, skipping third-party files");
            Vec::new()
        } else {
            DependencyResolver::new(&self.options.dependencies, &self.root)
                .resolve()
                .await
                .map_err(|err| {
                    StageError::new(ErrorKind::Dependency, StageKind::Collect, err.to_string())
                })?
        };

        for path in &third_party {
            let contents = self.read(path).await?;
            files.files.push(FileRecord::new(path, contents, Origin::ThirdParty));
        }

        for path in self.sources.expand(&self.root) {
            if third_party.contains(&path) {
                continue;
            }
            let contents = self.read(&path).await?;
            files.files.push(FileRecord::new(path, contents, Origin::Own));
        }

        info!(
            "Collected {} third-party and {} own files",
            third_party.len(),
            files.files.len() - third_party.len()
        );
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<String, StageError> {
        let bytes = fs::read(self.root.join(path)).await.map_err(|err| {
            StageError::new(ErrorKind::FileSystem, StageKind::Collect, "Failed to read file")
                .with_file(path)
                .with_cause(err)
        })?;

        String::from_utf8(bytes).map_err(|err| {
            StageError::new(ErrorKind::FileSystem, StageKind::Collect, "File is not valid UTF-8")
                .with_file(path)
                .with_cause(err)
        })
    }

    fn concat(&self, destination: &str, files: &mut FileSet) {
        if files.files.is_empty() {
            info!("No files to concatenate");
            return;
        }

        let name = artifact_name(destination);
        files.artifact = Some(sourcemap::concat(&files.files, &name, files.sourcemaps));
    }

    /// Writes the artifact, and its map if any, into the directory of
    /// `destination`.
    async fn write(
        &self,
        stage: StageKind,
        destination: &str,
        files: &FileSet,
    ) -> Result<(), StageError> {
        let Some(artifact) = &files.artifact else {
            debug!("Nothing to write for {}", destination);
            return Ok(());
        };

        let directory = Path::new(destination)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let filesystem_error = |path: &Path, err: std::io::Error| {
            StageError::new(ErrorKind::FileSystem, stage, "Failed to write output")
                .with_file(path)
                .with_cause(err)
        };

        fs::create_dir_all(self.root.join(&directory))
            .await
            .map_err(|err| filesystem_error(&directory, err))?;

        let mut outputs = vec![(artifact.name.clone(), artifact.contents.clone())];
        if let Some(map_file) = &artifact.map_file {
            outputs.push(map_file.clone());
        }

        for (name, contents) in outputs {
            let path = directory.join(name);
            fs::write(self.root.join(&path), contents.into_bytes())
                .await
                .0
                .map_err(|err| filesystem_error(&path, err))?;
            info!("Wrote {}", path.display());
        }

        Ok(())
    }

    /// Rolls back this run's cache admissions and reports the failure.
    fn fail(&mut self, error: StageError, files: &FileSet) -> RunOutcome {
        for path in &files.admitted {
            self.unchanged.forget(CACHE_NAME, path);
        }

        error!("{}", error);
        if self.options.errors.notify {
            self.notifier.notify(&Notification::failed(&error));
        }

        RunOutcome::Failed(error)
    }
}

fn artifact_name(destination: &str) -> String {
    Path::new(destination)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| destination.to_string())
}

fn write_sourcemap(stage: StageKind, files: &mut FileSet) -> Result<(), StageError> {
    let Some(artifact) = &mut files.artifact else {
        return Ok(());
    };
    let Some(map) = &artifact.source_map else {
        return Ok(());
    };

    let json = map.to_json().map_err(|err| {
        StageError::new(ErrorKind::Transform, stage, "Failed to serialize source map")
            .with_cause(err)
    })?;
    let map_name = format!("{}.map", artifact.name);

    artifact
        .contents
        .push_str(&format!("\n//# sourceMappingURL={map_name}"));
    artifact.map_file = Some((map_name, json));
    Ok(())
}

fn tool_failure(kind: ErrorKind, stage: StageKind, file: &Path, err: ToolError) -> StageError {
    let message = err
        .tool_output()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());

    StageError::new(kind, stage, message)
        .with_file(file)
        .with_cause(err)
}
