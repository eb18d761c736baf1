use crate::domain::model::{Batch, FailureRecord, FetchError, ProductRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Performs the network call for a single identifier. The engine treats this
/// as opaque: one identifier in, one record or one typed failure out. Attempt
/// timeouts and retries are the executor's business, not the fetcher's.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> std::result::Result<ProductRecord, FetchError>;
}

/// Receives sealed batches and end-of-job reports. A batch is only considered
/// persisted once `write_batch` returns Ok.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Persists a sealed batch, returning the path it was written to.
    async fn write_batch(&self, batch: &Batch) -> Result<String>;

    async fn write_error_report(&self, failures: &[FailureRecord]) -> Result<()>;

    async fn write_summary(&self, summary: &serde_json::Value) -> Result<()>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
