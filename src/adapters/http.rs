use crate::domain::ports::DatasetSource;
use crate::utils::error::{Result, RiskError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Downloads the reference dataset once per index build.
pub struct HttpDatasetSource {
    url: String,
    client: Client,
}

impl HttpDatasetSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        tracing::debug!("Making dataset request to: {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        tracing::debug!("Dataset response status: {}", response.status());

        if !response.status().is_success() {
            return Err(RiskError::DatasetSourceError {
                source_name: self.url.clone(),
                message: format!("HTTP {}", response.status()),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
