use crate::domain::ports::DatasetSource;
use crate::utils::error::{Result, RiskError};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct FileDatasetSource {
    path: PathBuf,
}

impl FileDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DatasetSource for FileDatasetSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        tracing::debug!("Reading dataset file {}", self.path.display());
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| RiskError::DatasetSourceError {
                source_name: self.describe(),
                message: e.to_string(),
            })
    }
}
