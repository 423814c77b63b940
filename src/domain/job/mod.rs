//! Image job domain - Units of work accepted by the processing queue

mod entity;

pub use entity::{ImageJob, JobId, QueueSnapshot};
