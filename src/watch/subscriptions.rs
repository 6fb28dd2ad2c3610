use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode};
use tracing::{debug, warn};

use crate::config::ValidPathConfig;
use crate::ext::normalize_path;
use crate::filesystem::{STATE_DIR, SourcePatterns};
use crate::pipeline::Orchestrator;
use crate::tools::{DependencyResolver, Notifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Rebuild,
    /// A source file is gone and must be evicted before the next run.
    Deleted(PathBuf),
    Reload,
}

/// A directory to hand to the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub mode: RecursiveMode,
}

/// What the watch loop listens to and how each change is answered.
#[derive(Debug, Clone)]
pub struct Subscriptions {
    root: PathBuf,
    sources: SourcePatterns,
    third_party: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
}

impl Subscriptions {
    /// `root` must be the form of the project root that watcher events
    /// report. All other paths are relative to it.
    pub fn new(
        root: PathBuf,
        sources: SourcePatterns,
        third_party: Vec<PathBuf>,
        outputs: Vec<PathBuf>,
    ) -> Self {
        Self {
            root,
            sources,
            third_party,
            outputs,
        }
    }

    /// Subscriptions for the project an orchestrator builds. Third-party
    /// files are left out in solo mode.
    pub async fn resolve<N: Notifier>(orchestrator: &Orchestrator<N>) -> Self {
        let root = orchestrator
            .root()
            .canonicalize()
            .unwrap_or_else(|_| orchestrator.root().to_path_buf());

        let third_party = if orchestrator.flags().solo {
            Vec::new()
        } else {
            DependencyResolver::new(&orchestrator.options().dependencies, orchestrator.root())
                .resolve()
                .await
                .unwrap_or_else(|err| {
                    warn!("Not watching third-party files: {}", err);
                    Vec::new()
                })
        };

        Self::new(
            root,
            orchestrator.sources().clone(),
            third_party,
            output_files(&orchestrator.options().paths),
        )
    }

    /// Directories to watch, deduplicated.
    pub fn targets(&self) -> Vec<WatchTarget> {
        let mut seen = HashSet::new();
        let sources = self.sources.base_dirs().into_iter().map(|dir| WatchTarget {
            path: self.root.join(dir),
            mode: RecursiveMode::Recursive,
        });
        let parents = self
            .third_party
            .iter()
            .chain(&self.outputs)
            .map(|file| WatchTarget {
                path: self.root.join(file.parent().unwrap_or(Path::new(""))),
                mode: RecursiveMode::NonRecursive,
            });

        sources
            .chain(parents)
            .filter(|target| seen.insert(target.path.clone()))
            .collect()
    }

    /// Maps a watcher event to the signals it raises. Outputs are checked
    /// first so writing the artifact never schedules another build.
    pub fn classify(&self, event: &Event) -> Vec<WatchSignal> {
        if matches!(event.kind, EventKind::Access(_)) {
            return Vec::new();
        }

        let mut signals = Vec::new();
        for (index, path) in event.paths.iter().enumerate() {
            let Some(relative) = self.relative(path) else {
                continue;
            };
            let removed = is_removal(&event.kind, index);

            if self.outputs.contains(&relative) {
                if !removed {
                    signals.push(WatchSignal::Reload);
                }
            } else if self.sources.is_match(&relative) {
                signals.push(if removed {
                    WatchSignal::Deleted(relative)
                } else {
                    WatchSignal::Rebuild
                });
            } else if self.third_party.contains(&relative) {
                signals.push(WatchSignal::Rebuild);
            } else {
                debug!("Ignoring change to {}", relative.display());
            }
        }

        signals
    }

    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if relative.starts_with(STATE_DIR) {
            return None;
        }
        Some(normalize_path(relative))
    }
}

/// Both artifacts and their source maps, relative to the root.
fn output_files(paths: &ValidPathConfig) -> Vec<PathBuf> {
    [&paths.dest().dev, &paths.dest().dist]
        .into_iter()
        .flat_map(|destination| [destination.clone(), format!("{destination}.map")])
        .map(|file| normalize_path(Path::new(&file)))
        .collect()
}

/// Whether the path at `index` of an event no longer exists afterwards.
fn is_removal(kind: &EventKind, index: usize) -> bool {
    match kind {
        EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => true,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => index == 0,
        _ => false,
    }
}
