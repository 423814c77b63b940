//! HTTP client for the results API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::ExternalApiConfig;
use crate::domain::{DomainError, ResultReporter, ResultUpdate};

const UPDATE_RESULT_PATH: &str = "results/updateResultImage";

/// Sends result updates with `PUT {base}/results/updateResultImage`
#[derive(Debug, Clone)]
pub struct HttpResultReporter {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpResultReporter {
    pub fn new(config: &ExternalApiConfig) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim().to_string(),
            api_key: config
                .api_key
                .as_ref()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        })
    }

    fn update_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), UPDATE_RESULT_PATH)
    }
}

#[async_trait]
impl ResultReporter for HttpResultReporter {
    async fn update_result(
        &self,
        update: &ResultUpdate,
    ) -> Result<serde_json::Value, DomainError> {
        if self.base_url.is_empty() {
            return Err(DomainError::configuration(
                "EXTERNAL_API_URL is not configured",
            ));
        }

        let url = self.update_url();
        let mut request = self.http.put(&url).json(update);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::external_api(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::external_api_status(
                status.as_u16(),
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DomainError::external_api(format!("Failed to read response: {}", e)))?;

        debug!(
            result_id = update.id,
            status = %update.status,
            http_status = status.as_u16(),
            "Result update accepted"
        );

        if body.is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_slice(&body)
            .map_err(|e| DomainError::external_api(format!("Failed to parse response: {}", e)))
    }

    fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }
}
