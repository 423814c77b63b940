//! In-memory blob storage implementation

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{BlobLocation, BlobStorage, DomainError};

const PUBLIC_BASE_URL: &str = "https://storage.googleapis.com";

/// Thread-safe in-memory blob storage
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryBlobStorage {
    default_bucket: String,
    buckets: RwLock<HashMap<String, HashMap<String, Bytes>>>,
    http_objects: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStorage {
    /// Creates storage with an empty default bucket
    pub fn new(default_bucket: impl Into<String>) -> Self {
        let default_bucket = default_bucket.into();
        let mut buckets = HashMap::new();
        buckets.insert(default_bucket.clone(), HashMap::new());

        Self {
            default_bucket,
            buckets: RwLock::new(buckets),
            http_objects: RwLock::new(HashMap::new()),
        }
    }

    /// Serve `data` for downloads of an `http(s)` URL
    pub fn with_http_object(self, url: impl Into<String>, data: impl Into<Bytes>) -> Self {
        if let Ok(mut objects) = self.http_objects.write() {
            objects.insert(url.into(), data.into());
        }
        self
    }

    /// Store `data` as `gs://bucket/name`, creating the bucket if needed
    pub fn with_object(
        self,
        bucket: impl Into<String>,
        name: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets
                .entry(bucket.into())
                .or_default()
                .insert(name.into(), data.into());
        }
        self
    }

    /// Fetch a stored object
    pub fn object(&self, bucket: &str, name: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .ok()?
            .get(bucket)?
            .get(name)
            .cloned()
    }

    /// Names of all objects in a bucket, sorted
    pub fn object_names(&self, bucket: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .buckets
            .read()
            .map(|buckets| {
                buckets
                    .get(bucket)
                    .map(|objects| objects.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn download(&self, blob_url: &str) -> Result<Bytes, DomainError> {
        match BlobLocation::parse(blob_url)? {
            BlobLocation::Http(url) => {
                let objects = self.http_objects.read().map_err(|e| {
                    DomainError::storage(format!("Failed to acquire read lock: {}", e))
                })?;

                objects
                    .get(&url)
                    .cloned()
                    .ok_or_else(|| DomainError::not_found(format!("No object at {}", url)))
            }
            BlobLocation::Gcs { bucket, object } => self.object(&bucket, &object).ok_or_else(|| {
                DomainError::not_found(format!("Object gs://{}/{} not found", bucket, object))
            }),
        }
    }

    async fn upload(
        &self,
        data: Bytes,
        blob_name: &str,
        bucket: Option<&str>,
    ) -> Result<String, DomainError> {
        let bucket = bucket.unwrap_or(self.default_bucket.as_str());

        let mut buckets = self
            .buckets
            .write()
            .map_err(|e| DomainError::storage(format!("Failed to acquire write lock: {}", e)))?;

        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| DomainError::storage(format!("Bucket does not exist: {}", bucket)))?;

        objects.insert(blob_name.to_string(), data);

        Ok(format!("{}/{}/{}", PUBLIC_BASE_URL, bucket, blob_name))
    }

    async fn bucket_exists(&self, bucket: Option<&str>) -> Result<bool, DomainError> {
        let bucket = bucket.unwrap_or(self.default_bucket.as_str());
        let buckets = self
            .buckets
            .read()
            .map_err(|e| DomainError::storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(buckets.contains_key(bucket))
    }
}
