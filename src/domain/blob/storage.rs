//! Blob storage trait definition

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::DomainError;

/// Reads input images and stores annotated results
#[async_trait]
pub trait BlobStorage: Send + Sync + Debug {
    /// Download an image from an `http(s)://` or `gs://` URL
    async fn download(&self, blob_url: &str) -> Result<Bytes, DomainError>;

    /// Upload a JPEG into `bucket` (the configured bucket when `None`),
    /// returning its public HTTPS URL
    async fn upload(
        &self,
        data: Bytes,
        blob_name: &str,
        bucket: Option<&str>,
    ) -> Result<String, DomainError>;

    /// Check whether a bucket exists (the configured bucket when `None`)
    async fn bucket_exists(&self, bucket: Option<&str>) -> Result<bool, DomainError>;
}
