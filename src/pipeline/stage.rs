use derive_more::Display;

use crate::pipeline::RunMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StageKind {
    #[display("collect")]
    Collect,
    #[display("filter")]
    FilterOwnSource,
    #[display("sourcemaps:init")]
    InitSourcemaps,
    #[display("cached")]
    SkipUnchanged,
    #[display("lint")]
    Lint,
    #[display("transpile")]
    Transpile,
    #[display("remember")]
    Recombine,
    #[display("restore")]
    RestoreThirdParty,
    #[display("concat:dist")]
    ConcatProduction,
    #[display("concat:dev")]
    ConcatDevelopment,
    #[display("minify")]
    Minify,
    #[display("sourcemaps:write")]
    WriteSourcemaps,
    #[display("dest:dist")]
    WriteProduction,
    #[display("dest:dev")]
    WriteDevelopment,
    #[display("notify")]
    Notify,
}

/// When a stage takes part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Always,
    Production,
    Development,
    SourcemapsOrDevelopment,
}

impl Activation {
    pub fn is_active(self, mode: RunMode) -> bool {
        match self {
            Activation::Always => true,
            Activation::Production => mode.is_production(),
            Activation::Development => mode.is_development(),
            Activation::SourcemapsOrDevelopment => mode.use_sourcemaps() || mode.is_development(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub kind: StageKind,
    pub activation: Activation,
}

const fn stage(kind: StageKind, activation: Activation) -> Stage {
    Stage { kind, activation }
}

/// Ordered list of stages. Later stages consume what earlier ones produce, so
/// the order is fixed.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn scripts() -> Self {
        use Activation::*;

        Self {
            stages: vec![
                stage(StageKind::Collect, Always),
                stage(StageKind::FilterOwnSource, Always),
                stage(StageKind::InitSourcemaps, SourcemapsOrDevelopment),
                stage(StageKind::SkipUnchanged, Always),
                stage(StageKind::Lint, Always),
                stage(StageKind::Transpile, Always),
                stage(StageKind::Recombine, Always),
                stage(StageKind::RestoreThirdParty, Always),
                stage(StageKind::ConcatProduction, Production),
                stage(StageKind::ConcatDevelopment, Development),
                stage(StageKind::Minify, Production),
                stage(StageKind::WriteSourcemaps, SourcemapsOrDevelopment),
                stage(StageKind::WriteProduction, Production),
                stage(StageKind::WriteDevelopment, Development),
                stage(StageKind::Notify, Always),
            ],
        }
    }

    pub fn active_stages(&self, mode: RunMode) -> impl Iterator<Item = StageKind> + '_ {
        self.stages
            .iter()
            .filter(move |stage| stage.activation.is_active(mode))
            .map(|stage| stage.kind)
    }
}
