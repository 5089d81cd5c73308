// Adapters layer: concrete implementations of the domain ports (dataset sources, storage).

pub mod file;
pub mod http;
pub mod storage;

pub use file::FileDatasetSource;
pub use http::HttpDatasetSource;
pub use storage::LocalStorage;

use crate::config::engine_config::{DatasetConfig, DatasetSourceKind};
use crate::domain::ports::DatasetSource;
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;
use std::time::Duration;

/// 依設定建立資料集來源
pub fn source_from_config(config: &DatasetConfig) -> Result<Box<dyn DatasetSource>> {
    match config.source {
        DatasetSourceKind::File => {
            let path = validate_required_field("dataset.path", &config.path)?;
            Ok(Box::new(FileDatasetSource::new(path)))
        }
        DatasetSourceKind::Http => {
            let url = validate_required_field("dataset.url", &config.url)?;
            Ok(Box::new(HttpDatasetSource::new(
                url,
                Duration::from_secs(config.timeout_seconds),
            )?))
        }
    }
}
