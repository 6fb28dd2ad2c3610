use std::path::Path;

use snafu::prelude::*;

use crate::config::Setting;

/// Shown whenever a paths descriptor is rejected.
pub const USAGE_HINT: &str = "------------------------------------
Paths must be relative and
must be set in the following format:
------------------------------------
paths:
  src: <string|list>
  dest:
    dev: <string>
    dist: <string>
------------------------------------";

const DESTINATION_KEYS: &[&str] = &["destination", "dest", "build"];
const DEVELOPMENT_KEYS: &[&str] = &["dev"];
const PRODUCTION_KEYS: &[&str] = &["dist", "prod"];

/// Source globs exactly as the user wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSet {
    Single(String),
    Many(Vec<String>),
}

impl SourceSet {
    pub fn patterns(&self) -> &[String] {
        match self {
            SourceSet::Single(pattern) => std::slice::from_ref(pattern),
            SourceSet::Many(patterns) => patterns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub dev: String,
    pub dist: String,
}

/// A paths descriptor that passed [`validate`]. Only constructed there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPathConfig {
    src: SourceSet,
    dest: Destination,
}

impl ValidPathConfig {
    pub fn src(&self) -> &SourceSet {
        &self.src
    }

    pub fn dest(&self) -> &Destination {
        &self.dest
    }
}

/// Checks the shape of a paths descriptor and rejects absolute paths.
pub fn validate(paths: &Setting) -> Result<ValidPathConfig, ConfigError> {
    ensure!(
        paths.as_mapping().is_some(),
        MalformedShapeSnafu {
            reason: "paths must be a mapping",
        }
    );

    let src = match paths.get("src") {
        Some(Setting::String(pattern)) => SourceSet::Single(pattern.clone()),
        Some(list @ Setting::Sequence(_)) => {
            SourceSet::Many(list.as_string_list().context(MalformedShapeSnafu {
                reason: "every src entry must be a string",
            })?)
        }
        _ => {
            return MalformedShapeSnafu {
                reason: "src must be a string or a list of strings",
            }
            .fail();
        }
    };

    let destination = paths
        .get_any(DESTINATION_KEYS)
        .filter(|dest| dest.as_mapping().is_some())
        .context(MalformedShapeSnafu {
            reason: "dest must be a mapping",
        })?;
    let dev = destination
        .get_any(DEVELOPMENT_KEYS)
        .and_then(Setting::as_str)
        .context(MalformedShapeSnafu {
            reason: "dest.dev must be a string",
        })?;
    let dist = destination
        .get_any(PRODUCTION_KEYS)
        .and_then(Setting::as_str)
        .context(MalformedShapeSnafu {
            reason: "dest.dist must be a string",
        })?;

    let candidates = src.patterns().iter().map(String::as_str).chain([dev, dist]);
    for candidate in candidates {
        ensure!(
            !is_absolute(candidate),
            AbsolutePathNotAllowedSnafu { path: candidate }
        );
    }

    Ok(ValidPathConfig {
        src,
        dest: Destination {
            dev: dev.to_string(),
            dist: dist.to_string(),
        },
    })
}

fn is_absolute(candidate: &str) -> bool {
    let pattern = candidate.strip_prefix('!').unwrap_or(candidate);
    Path::new(pattern).is_absolute()
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Malformed paths: {}\n{}", reason, USAGE_HINT))]
    MalformedShape { reason: String },
    #[snafu(display("Absolute path not allowed: {}\n{}", path, USAGE_HINT))]
    AbsolutePathNotAllowed { path: String },
}
