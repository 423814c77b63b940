//! Result domain - Reporting processed images back to the results API

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Final state of a processed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Finished,
    Failed,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `PUT /results/updateResultImage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultUpdate {
    pub id: i64,
    #[serde(rename = "resultImage")]
    pub result_image: String,
    pub status: ResultStatus,
    pub object_count: u64,
}

impl ResultUpdate {
    pub fn finished(id: i64, result_image: impl Into<String>, object_count: u64) -> Self {
        Self {
            id,
            result_image: result_image.into(),
            status: ResultStatus::Finished,
            object_count,
        }
    }

    /// Failure report: no image and zero objects
    pub fn failed(id: i64) -> Self {
        Self {
            id,
            result_image: String::new(),
            status: ResultStatus::Failed,
            object_count: 0,
        }
    }
}

/// Sink for result updates
#[async_trait]
pub trait ResultReporter: Send + Sync + Debug {
    async fn update_result(&self, update: &ResultUpdate)
    -> Result<serde_json::Value, DomainError>;

    /// Whether the reporter has somewhere to send updates
    fn is_configured(&self) -> bool;
}
