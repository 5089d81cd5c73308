#[cfg(feature = "cli")]
pub mod cli;
pub mod engine_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, OutputFormat};
pub use engine_config::{
    BatchConfig, CompressionConfig, ConditionRule, DatasetConfig, DatasetSourceKind, EngineConfig,
    MatcherConfig, NormalizerConfig, ScoringConfig, ToxicologyConfig,
};
