//! Request and response bodies of the image endpoints

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use super::error::ApiError;

pub const SERVICE_MESSAGE: &str = "Detecção de Criadouro Service API";
pub const QUEUED_MESSAGE: &str = "Image has been queued for processing";

/// Body of `POST /process-images`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessImageRequest {
    pub image_url: String,
    #[serde(rename = "resultId", deserialize_with = "deserialize_result_id")]
    pub result_id: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResultIdValue {
    Number(i64),
    Text(String),
}

/// Result ids arrive as JSON numbers or numeric strings
fn deserialize_result_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match ResultIdValue::deserialize(deserializer)? {
        ResultIdValue::Number(id) => Ok(id),
        ResultIdValue::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("resultId must be an integer, got {:?}", text))
        }),
    }
}

impl ProcessImageRequest {
    /// Accept only absolute `http`/`https` URLs with a host and return
    /// the normalized URL
    pub fn validate(&self) -> Result<Url, ApiError> {
        let invalid = || {
            ApiError::unprocessable("image_url must be a valid http or https URL")
                .with_param("image_url")
                .with_code("invalid_url")
        };

        let url = Url::parse(self.image_url.trim()).map_err(|_| invalid())?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessImageResponse {
    pub message: String,
    pub queued_image: String,
}

impl ProcessImageResponse {
    pub fn queued(image_url: impl Into<String>) -> Self {
        Self {
            message: QUEUED_MESSAGE.to_string(),
            queued_image: image_url.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
