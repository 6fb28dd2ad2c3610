use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use hashlink::LinkedHashMap;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::config::{EffectiveOptions, Setting, SetupError};
use crate::filesystem::PatternError;
use crate::pipeline::{BuildFlags, Orchestrator, RunOutcome};
use crate::tools::Notifier;
use crate::watch::{self, WatchError};

pub const COMPILE: &str = "compile";
pub const DEFAULT: &str = "default";
pub const WATCH: &str = "watch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Compile,
    Watch,
}

#[derive(Debug, Clone)]
struct Command {
    action: Action,
    dependencies: Vec<String>,
}

/// Registered commands, their aliases and what each one runs first.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    options: Arc<EffectiveOptions>,
    commands: LinkedHashMap<String, Command>,
    aliases: LinkedHashMap<String, String>,
}

/// Validates `paths`, merges `overrides` over the defaults and registers the
/// commands. Nothing is registered when the paths are invalid.
pub fn setup(paths: &Setting, overrides: Option<&Setting>) -> Result<CommandRegistry, SetupError> {
    let options = EffectiveOptions::new(paths, overrides)?;
    debug!("Effective options: {:?}", options.merged());

    let mut registry = CommandRegistry {
        options: Arc::new(options),
        commands: LinkedHashMap::new(),
        aliases: LinkedHashMap::new(),
    };
    registry.register(COMPILE, Action::Compile, &[]);
    registry.alias(DEFAULT, COMPILE);
    registry.register(WATCH, Action::Watch, &[DEFAULT]);

    Ok(registry)
}

impl CommandRegistry {
    fn register(&mut self, name: &str, action: Action, dependencies: &[&str]) {
        self.commands.insert(
            name.to_string(),
            Command {
                action,
                dependencies: dependencies.iter().map(|dep| dep.to_string()).collect(),
            },
        );
    }

    fn alias(&mut self, alias: &str, name: &str) {
        self.aliases.insert(alias.to_string(), name.to_string());
    }

    /// Command names and aliases, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.commands
            .keys()
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect()
    }

    fn resolve(&self, name: &str) -> Option<(&str, &Command)> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.commands
            .get_key_value(name)
            .map(|(name, command)| (name.as_str(), command))
    }

    /// Actions to run for `target`, dependencies first, each once.
    pub fn execution_order(&self, target: &str) -> Result<Vec<Action>, CommandError> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        self.collect(target, &mut visited, &mut order)?;
        Ok(order)
    }

    fn collect<'a>(
        &'a self,
        name: &str,
        visited: &mut HashSet<&'a str>,
        order: &mut Vec<Action>,
    ) -> Result<(), CommandError> {
        let (name, command) = self.resolve(name).ok_or_else(|| CommandError::UnknownCommand {
            name: name.to_string(),
            known: self.names().join(", "),
        })?;
        if !visited.insert(name) {
            return Ok(());
        }

        for dependency in &command.dependencies {
            self.collect(dependency, visited, order)?;
        }
        order.push(command.action);
        Ok(())
    }

    /// Runs `target` against the project in `root`. Returns the outcome of
    /// the last pipeline run, if any ran.
    pub async fn run<N: Notifier>(
        &self,
        target: &str,
        root: &Path,
        flags: BuildFlags,
        notifier: N,
    ) -> Result<Option<RunOutcome>, CommandError> {
        let actions = self.execution_order(target)?;
        debug!("Running {} as {:?}", target, actions);

        let mut orchestrator = Orchestrator::new(self.options.clone(), root, flags, notifier)
            .context(PatternSnafu)?;
        let mut outcome = None;

        for action in actions {
            match action {
                Action::Compile => {
                    let result = orchestrator.compile().await;
                    info!("Compile finished: {:?}", result);
                    outcome = Some(result);
                }
                Action::Watch => watch::watch(&mut orchestrator).await.context(WatchSnafu)?,
            }
        }

        Ok(outcome)
    }
}

#[derive(Debug, Snafu)]
pub enum CommandError {
    #[snafu(display("Unknown command '{}', expected one of: {}", name, known))]
    UnknownCommand { name: String, known: String },
    #[snafu(display("Invalid source pattern"))]
    PatternError { source: PatternError },
    #[snafu(display("Watching failed"))]
    WatchError { source: WatchError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::pipeline::Environment;
    use crate::tools::testing::RecordingNotifier;
    use rstest::*;
    use tempfile::TempDir;

    fn paths(yaml: &str) -> Setting {
        Setting::parse_document(yaml).unwrap().unwrap()
    }

    fn registry() -> CommandRegistry {
        setup(
            &paths("src: src/*.js\ndest:\n  dev: build/app.js\n  dist: dist/app.js\n"),
            None,
        )
        .unwrap()
    }

    #[test]
    fn registers_compile_default_and_watch() {
        assert_eq!(registry().names(), vec!["compile", "watch", "default"]);
    }

    #[rstest]
    #[case("compile", vec![Action::Compile])]
    #[case("default", vec![Action::Compile])]
    #[case("watch", vec![Action::Compile, Action::Watch])]
    fn orders_dependencies_first(#[case] target: &str, #[case] expected: Vec<Action>) {
        assert_eq!(registry().execution_order(target).unwrap(), expected);
    }

    #[test]
    fn unknown_command_lists_known_ones() {
        let error = registry().execution_order("deploy").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unknown command 'deploy', expected one of: compile, watch, default"
        );
    }

    #[test]
    fn absolute_path_prevents_registration() {
        let error = setup(
            &paths("src: /abs/a.js\ndest:\n  dev: build/d.js\n  dist: build/p.js\n"),
            None,
        )
        .unwrap_err();

        match error {
            SetupError::InvalidPathsError {
                source: ConfigError::AbsolutePathNotAllowed { path },
            } => assert_eq!(path, "/abs/a.js"),
            other => panic!("Expected AbsolutePathNotAllowed, got {other:?}"),
        }
    }

    #[compio::test]
    async fn default_compiles_once() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.js"), "a();").unwrap();

        let outcome = registry()
            .run(DEFAULT, dir.path(), BuildFlags::default(), RecordingNotifier::default())
            .await
            .unwrap();

        assert_eq!(outcome, Some(RunOutcome::Completed(Environment::Development)));
        assert!(dir.path().join("build/app.js").is_file());
    }
}
