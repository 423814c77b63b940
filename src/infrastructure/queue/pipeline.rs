//! Per-job processing: download, annotate, upload, report

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::domain::{
    BlobStorage, DomainError, ImageJob, ProcessedImage, ResultReporter, ResultStatus, ResultUpdate,
};
use crate::infrastructure::detection::ImageAnnotator;
use crate::infrastructure::observability::{record_job, record_report_failure};

/// Final state of a job after reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Processed and reported as finished
    Finished { image_url: String, detected: u64 },
    /// Processing or the finished report failed
    Failed,
}

impl JobOutcome {
    pub fn status(&self) -> ResultStatus {
        match self {
            Self::Finished { .. } => ResultStatus::Finished,
            Self::Failed => ResultStatus::Failed,
        }
    }
}

/// Everything a worker needs to process one job
#[derive(Debug, Clone)]
pub struct JobPipeline {
    storage: Arc<dyn BlobStorage>,
    annotator: Arc<ImageAnnotator>,
    reporter: Arc<dyn ResultReporter>,
    processed_prefix: String,
}

impl JobPipeline {
    pub fn new(
        storage: Arc<dyn BlobStorage>,
        annotator: Arc<ImageAnnotator>,
        reporter: Arc<dyn ResultReporter>,
        processed_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            annotator,
            reporter,
            processed_prefix: processed_prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Name of the uploaded object, unique per microsecond
    pub fn processed_blob_name(&self) -> String {
        let file = format!("processed_{}.jpg", Utc::now().format("%Y%m%d_%H%M%S_%6f"));

        if self.processed_prefix.is_empty() {
            file
        } else {
            format!("{}/{}", self.processed_prefix, file)
        }
    }

    /// Process and report a job; never fails, outcomes are logged
    pub async fn run(&self, job: &ImageJob) -> JobOutcome {
        let started = Instant::now();
        info!(
            job_id = %job.id,
            result_id = job.result_id,
            image_url = %job.image_url,
            "Processing image"
        );

        let outcome = match self.process(job).await {
            Ok((image_url, detected)) => {
                info!(
                    job_id = %job.id,
                    result_id = job.result_id,
                    processed_image_url = %image_url,
                    detected_count = detected,
                    "Processed image uploaded"
                );
                self.report_finished(job, image_url, detected).await
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    result_id = job.result_id,
                    image_url = %job.image_url,
                    error = %e,
                    "Error processing image"
                );
                self.report_failed(job).await;
                JobOutcome::Failed
            }
        };

        let detected = match &outcome {
            JobOutcome::Finished { detected, .. } => *detected,
            JobOutcome::Failed => 0,
        };
        record_job(outcome.status(), started.elapsed(), detected);

        outcome
    }

    async fn process(&self, job: &ImageJob) -> Result<(String, u64), DomainError> {
        let data = self.storage.download(&job.image_url).await?;

        let annotator = self.annotator.clone();
        let processed: ProcessedImage =
            tokio::task::spawn_blocking(move || annotator.process(&data))
                .await
                .map_err(|e| DomainError::internal(format!("Detection task failed: {}", e)))??;

        let detected = processed.detected_count() as u64;
        let url = self
            .storage
            .upload(Bytes::from(processed.bytes), &self.processed_blob_name(), None)
            .await?;

        Ok((url, detected))
    }

    async fn report_finished(&self, job: &ImageJob, image_url: String, detected: u64) -> JobOutcome {
        let update = ResultUpdate::finished(job.result_id, image_url.clone(), detected);

        match self.reporter.update_result(&update).await {
            Ok(_) => {
                info!(result_id = job.result_id, "Successfully updated result");
                JobOutcome::Finished {
                    image_url,
                    detected,
                }
            }
            Err(e) => {
                record_report_failure(ResultStatus::Finished);
                error!(
                    job_id = %job.id,
                    result_id = job.result_id,
                    error = %e,
                    "Failed to update result"
                );
                self.report_failed(job).await;
                JobOutcome::Failed
            }
        }
    }

    async fn report_failed(&self, job: &ImageJob) {
        if let Err(e) = self
            .reporter
            .update_result(&ResultUpdate::failed(job.result_id))
            .await
        {
            record_report_failure(ResultStatus::Failed);
            warn!(
                job_id = %job.id,
                result_id = job.result_id,
                error = %e,
                "Failed to send error status"
            );
        }
    }
}
