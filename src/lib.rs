pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{source_from_config, FileDatasetSource, HttpDatasetSource, LocalStorage};
pub use config::EngineConfig;
pub use core::dataset::{load_index, parse_dataset, DatasetFormat, IndexBuildReport};
pub use core::engine::{analyze, RiskEngine};
pub use core::reference_index::ReferenceIndex;
pub use domain::model::{AnalysisReport, IngredientVerdict, RawScanText, RiskLevel, SummaryRisk};
pub use domain::profile::UserSkinProfile;
pub use utils::error::{Result, RiskError};
