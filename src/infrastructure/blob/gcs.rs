//! Google Cloud Storage backend using the JSON API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::domain::{BlobLocation, BlobStorage, DomainError};

use super::token::{ServiceAccountKey, ServiceAccountTokenSource, TokenSource};

const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Blob storage backed by a GCS bucket
#[derive(Debug)]
pub struct GcsBlobStorage {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    bucket: String,
    api_base_url: String,
    public_base_url: String,
}

impl GcsBlobStorage {
    /// Build from configuration, loading the service account key file
    pub fn from_config(config: &StorageConfig) -> Result<Self, DomainError> {
        if config.bucket.is_empty() {
            return Err(DomainError::configuration(
                "GCP_STORAGE_BUCKET_NAME is required",
            ));
        }
        if config.project_id.is_empty() {
            return Err(DomainError::configuration("GCP_PROJECT_ID is required"));
        }
        if config.credentials_path.is_empty() {
            return Err(DomainError::configuration(
                "GCP_CREDENTIALS_PATH is required",
            ));
        }

        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        let tokens = ServiceAccountTokenSource::new(key, Duration::from_secs(config.timeout_secs))?;

        info!(
            bucket = %config.bucket,
            project_id = %config.project_id,
            "Initialized GCS blob storage"
        );

        Self::with_token_source(config, Arc::new(tokens))
    }

    /// Build with an explicit token source, skipping credential file handling
    pub fn with_token_source(
        config: &StorageConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            tokens,
            bucket: config.bucket.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Public HTTPS URL of an object
    pub fn public_url(&self, bucket: &str, blob_name: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, blob_name)
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!(
            "{}/storage/v1/b/{}",
            self.api_base_url,
            urlencoding::encode(bucket)
        )
    }

    fn object_url(&self, bucket: &str, object: &str) -> String {
        format!(
            "{}/o/{}",
            self.bucket_url(bucket),
            urlencoding::encode(object)
        )
    }

    fn upload_url(&self, bucket: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.api_base_url,
            urlencoding::encode(bucket)
        )
    }

    async fn download_http(&self, url: &str) -> Result<Bytes, DomainError> {
        debug!(url = %url, "Downloading image over HTTP");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Download of {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(DomainError::storage(format!(
                "Download of {} returned HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read body of {}: {}", url, e)))
    }

    async fn download_object(&self, bucket: &str, object: &str) -> Result<Bytes, DomainError> {
        debug!(bucket = %bucket, object = %object, "Downloading object from GCS");

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(self.object_url(bucket, object))
            .query(&[("alt", "media")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                DomainError::storage(format!("Download of gs://{}/{} failed: {}", bucket, object, e))
            })?;

        match response.status() {
            status if status.is_success() => response.bytes().await.map_err(|e| {
                DomainError::storage(format!("Failed to read gs://{}/{}: {}", bucket, object, e))
            }),
            StatusCode::NOT_FOUND => Err(DomainError::not_found(format!(
                "Object gs://{}/{} not found",
                bucket, object
            ))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(DomainError::storage(format!(
                    "Download of gs://{}/{} returned HTTP {}: {}",
                    bucket, object, status, body
                )))
            }
        }
    }
}

#[async_trait]
impl BlobStorage for GcsBlobStorage {
    async fn download(&self, blob_url: &str) -> Result<Bytes, DomainError> {
        match BlobLocation::parse(blob_url)? {
            BlobLocation::Http(url) => self.download_http(&url).await,
            BlobLocation::Gcs { bucket, object } => self.download_object(&bucket, &object).await,
        }
    }

    async fn upload(
        &self,
        data: Bytes,
        blob_name: &str,
        bucket: Option<&str>,
    ) -> Result<String, DomainError> {
        let bucket = bucket.unwrap_or(self.bucket.as_str());

        if !self.bucket_exists(Some(bucket)).await? {
            return Err(DomainError::storage(format!(
                "Bucket does not exist: {}",
                bucket
            )));
        }

        let size = data.len();
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.upload_url(bucket))
            .query(&[("uploadType", "media"), ("name", blob_name)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, JPEG_CONTENT_TYPE)
            .body(data)
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Upload of {} failed: {}", blob_name, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::storage(format!(
                "Upload of {} returned HTTP {}: {}",
                blob_name, status, body
            )));
        }

        debug!(bucket = %bucket, blob_name = %blob_name, size, "Uploaded object");

        Ok(self.public_url(bucket, blob_name))
    }

    async fn bucket_exists(&self, bucket: Option<&str>) -> Result<bool, DomainError> {
        let bucket = bucket.unwrap_or(self.bucket.as_str());
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .get(self.bucket_url(bucket))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("Bucket lookup failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(DomainError::storage(format!(
                "Bucket lookup for {} returned HTTP {}",
                bucket, status
            ))),
        }
    }
}
