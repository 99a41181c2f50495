use crate::domain::model::{ExtractionResultSet, TransformResult};
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// 輸出產物的寫入目的地
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 上游 API 的唯讀來源，每次呼叫只發出一個 GET 請求
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// `segments` 依序附加在 base URL 之後
    async fn get_json(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        timeout: Duration,
    ) -> std::result::Result<serde_json::Value, FetchError>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractionResultSet>;
    async fn transform(&self, data: ExtractionResultSet) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
