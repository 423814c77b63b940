//! Domain layer - Core entities and ports of the detection service

pub mod blob;
pub mod detection;
pub mod error;
pub mod job;
pub mod result;

pub use blob::{BlobLocation, BlobStorage};
pub use detection::{BoundingBox, Detection, Detector, ProcessedImage};
pub use error::DomainError;
pub use job::{ImageJob, JobId, QueueSnapshot};
pub use result::{ResultReporter, ResultStatus, ResultUpdate};
