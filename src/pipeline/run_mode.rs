use derive_more::Display;

/// Flags given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildFlags {
    pub production: bool,
    pub sourcemaps: bool,
    pub solo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Environment {
    Production,
    Development,
}

/// Mode of a single pipeline run. Resolved at the start of every run, never
/// cached between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMode {
    production: bool,
    sourcemaps: bool,
}

impl RunMode {
    pub fn new(production: bool, sourcemaps: bool) -> Self {
        Self {
            production,
            sourcemaps,
        }
    }

    pub fn resolve(flags: &BuildFlags) -> Self {
        Self::new(flags.production, flags.sourcemaps)
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    pub fn is_development(&self) -> bool {
        !self.production
    }

    pub fn use_sourcemaps(&self) -> bool {
        self.sourcemaps
    }

    pub fn environment(&self) -> Environment {
        if self.production {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}
