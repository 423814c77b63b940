//! Background processing of queued images

mod pipeline;
mod processor;

pub use pipeline::{JobOutcome, JobPipeline};
pub use processor::QueueProcessor;
