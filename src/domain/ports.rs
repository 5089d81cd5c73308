use crate::utils::error::Result;
use async_trait::async_trait;

/// 參考資料集的來源（本機檔案、HTTP 等）
#[async_trait]
pub trait DatasetSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch(&self) -> Result<Vec<u8>>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
