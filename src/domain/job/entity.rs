//! Image job entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to a job when it enters the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An image waiting to be downloaded, annotated and reported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageJob {
    pub id: JobId,
    pub image_url: String,
    pub result_id: i64,
    pub enqueued_at: DateTime<Utc>,
}

impl ImageJob {
    pub fn new(image_url: impl Into<String>, result_id: i64) -> Self {
        Self {
            id: JobId::generate(),
            image_url: image_url.into(),
            result_id,
            enqueued_at: Utc::now(),
        }
    }
}

/// Point-in-time counters of the processing queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub pending: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub failed: u64,
    pub accepting: bool,
}
