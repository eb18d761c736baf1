use crate::domain::model::{Batch, FailureRecord};
use crate::domain::ports::{BatchSink, Storage};
use crate::utils::error::{FetchJobError, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

/// Writes each sealed batch as a pretty JSON array (`products_NNN.json`),
/// permanent failures as a CSV error report, and the final summary as JSON.
pub struct JsonBatchSink<S: Storage> {
    storage: S,
}

impl<S: Storage> JsonBatchSink<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: Storage> BatchSink for JsonBatchSink<S> {
    async fn write_batch(&self, batch: &Batch) -> Result<String> {
        let name = format!("products_{:03}.json", batch.seq);
        let json = serde_json::to_vec_pretty(&batch.records)?;
        self.storage.write_file(&name, &json).await?;
        Ok(name)
    }

    async fn write_error_report(&self, failures: &[FailureRecord]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["id", "error_kind", "message"])?;
        for failure in failures {
            writer.write_record([
                failure.id.as_str(),
                failure.kind.as_str(),
                failure.message.as_str(),
            ])?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| FetchJobError::ProcessingError {
                message: format!("error report buffer: {}", e),
            })?;
        self.storage.write_file("error_report.csv", &data).await
    }

    async fn write_summary(&self, summary: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_vec_pretty(summary)?;
        self.storage.write_file("summary.json", &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FetchErrorKind, ProductRecord};
    use tempfile::TempDir;

    fn record(id: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: format!("Product {}", id),
            url_key: Some(format!("product-{}", id)),
            price: Some(10.0),
            description: "desc".to_string(),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_batch_file_name_and_contents() {
        let dir = TempDir::new().unwrap();
        let sink = JsonBatchSink::new(LocalStorage::new(dir.path()));

        let batch = Batch {
            seq: 7,
            ids: vec!["a".to_string(), "b".to_string()],
            records: vec![record("a"), record("b")],
        };
        let name = sink.write_batch(&batch).await.unwrap();
        assert_eq!(name, "products_007.json");

        let data = fs::read(dir.path().join("products_007.json")).unwrap();
        let parsed: Vec<ProductRecord> = serde_json::from_slice(&data).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id, "a");
        assert_eq!(parsed[1].id, "b");
    }

    #[tokio::test]
    async fn test_error_report_rows() {
        let dir = TempDir::new().unwrap();
        let sink = JsonBatchSink::new(LocalStorage::new(dir.path()));

        sink.write_error_report(&[FailureRecord {
            id: "x".to_string(),
            kind: FetchErrorKind::NotFound,
            message: "product not found (404)".to_string(),
        }])
        .await
        .unwrap();

        let report = fs::read_to_string(dir.path().join("error_report.csv")).unwrap();
        let mut lines = report.lines();
        assert_eq!(lines.next(), Some("id,error_kind,message"));
        assert_eq!(lines.next(), Some("x,not_found,product not found (404)"));
    }

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("nested/file.txt", b"hello").await.unwrap();
        let data = storage.read_file("nested/file.txt").await.unwrap();
        assert_eq!(data, b"hello");
    }
}
