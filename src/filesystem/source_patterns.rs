use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::filesystem::STATE_DIR;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

#[derive(Debug, Clone)]
struct IncludePattern {
    pattern: String,
    base: PathBuf,
    literal: bool,
    matcher: GlobMatcher,
}

/// Compiled `src` globs. Paths are always root-relative.
#[derive(Debug, Clone)]
pub struct SourcePatterns {
    includes: Vec<IncludePattern>,
    include_set: GlobSet,
    exclude_set: GlobSet,
}

impl SourcePatterns {
    pub fn new(patterns: &[String]) -> Result<Self, PatternError> {
        let mut includes = Vec::new();
        let mut include_builder = GlobSetBuilder::new();
        let mut exclude_builder = GlobSetBuilder::new();

        for raw in patterns {
            let (negated, pattern) = match raw.strip_prefix('!') {
                Some(rest) => (true, clean_pattern(rest)),
                None => (false, clean_pattern(raw)),
            };
            let glob = build_glob(&pattern)?;

            if negated {
                exclude_builder.add(glob);
                continue;
            }

            includes.push(IncludePattern {
                base: literal_base(&pattern),
                literal: !pattern.contains(GLOB_META),
                matcher: glob.compile_matcher(),
                pattern,
            });
            include_builder.add(glob);
        }

        Ok(Self {
            includes,
            include_set: include_builder.build().context(InvalidSetSnafu)?,
            exclude_set: exclude_builder.build().context(InvalidSetSnafu)?,
        })
    }

    /// Files inside the state directory never match.
    pub fn is_match(&self, relative: &Path) -> bool {
        !relative.starts_with(STATE_DIR)
            && self.include_set.is_match(relative)
            && !self.exclude_set.is_match(relative)
    }

    /// Directories that can contain matches, deduplicated. The empty path
    /// stands for the root itself.
    pub fn base_dirs(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.includes
            .iter()
            .map(|include| {
                if include.literal {
                    Path::new(&include.pattern)
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_default()
                } else {
                    include.base.clone()
                }
            })
            .filter(|dir| seen.insert(dir.clone()))
            .collect()
    }

    /// Lists matching files under `root`, in pattern order, each file once.
    pub fn expand(&self, root: &Path) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for include in &self.includes {
            let matches = if include.literal {
                let path = PathBuf::from(&include.pattern);
                if root.join(&path).is_file() {
                    vec![path]
                } else {
                    debug!("Source file {} does not exist", include.pattern);
                    Vec::new()
                }
            } else {
                walk(root, &include.base)
                    .into_iter()
                    .filter(|relative| include.matcher.is_match(relative))
                    .collect()
            };

            for relative in matches {
                if relative.starts_with(STATE_DIR) || self.exclude_set.is_match(&relative) {
                    continue;
                }
                if seen.insert(relative.clone()) {
                    files.push(relative);
                }
            }
        }

        files
    }
}

fn walk(root: &Path, base: &Path) -> Vec<PathBuf> {
    let start = root.join(base);
    if !start.is_dir() {
        debug!("Skipping missing source directory {}", start.display());
        return Vec::new();
    }

    let mut files = Vec::new();
    let state_dir = root.join(STATE_DIR);
    let walker = WalkBuilder::new(&start)
        .standard_filters(false)
        .filter_entry(move |entry| entry.path() != state_dir)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for result in walker {
        match result {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
            Err(err) => warn!("Error walking source directory: {}", err),
        }
    }

    files
}

fn clean_pattern(pattern: &str) -> String {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern.to_string()
}

fn build_glob(pattern: &str) -> Result<Glob, PatternError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .context(InvalidGlobSnafu { pattern })
}

/// The leading components of `pattern` that contain no glob syntax.
fn literal_base(pattern: &str) -> PathBuf {
    pattern
        .split('/')
        .take_while(|component| !component.contains(GLOB_META))
        .collect::<Vec<_>>()
        .join("/")
        .into()
}

#[derive(Debug, Snafu)]
pub enum PatternError {
    #[snafu(display("Invalid glob pattern: {}", pattern))]
    InvalidGlobError {
        pattern: String,
        source: globset::Error,
    },
    #[snafu(display("Failed to compile glob patterns"))]
    InvalidSetError { source: globset::Error },
}
