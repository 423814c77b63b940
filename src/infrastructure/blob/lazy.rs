//! Blob storage built on first use

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::OnceCell;

use crate::config::StorageConfig;
use crate::domain::{BlobStorage, DomainError};

use super::gcs::GcsBlobStorage;

/// Defers GCS client construction until a job needs it
///
/// Missing configuration surfaces as a job failure instead of a startup
/// failure. Construction errors are not cached, so the next call retries.
#[derive(Debug)]
pub struct LazyBlobStorage {
    config: StorageConfig,
    inner: OnceCell<Arc<GcsBlobStorage>>,
}

impl LazyBlobStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }

    fn get(&self) -> Result<&Arc<GcsBlobStorage>, DomainError> {
        self.inner
            .get_or_try_init(|| GcsBlobStorage::from_config(&self.config).map(Arc::new))
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }
}

#[async_trait]
impl BlobStorage for LazyBlobStorage {
    async fn download(&self, blob_url: &str) -> Result<Bytes, DomainError> {
        let storage = self.get()?.clone();
        storage.download(blob_url).await
    }

    async fn upload(
        &self,
        data: Bytes,
        blob_name: &str,
        bucket: Option<&str>,
    ) -> Result<String, DomainError> {
        let storage = self.get()?.clone();
        storage.upload(data, blob_name, bucket).await
    }

    async fn bucket_exists(&self, bucket: Option<&str>) -> Result<bool, DomainError> {
        let storage = self.get()?.clone();
        storage.bucket_exists(bucket).await
    }
}
