//! Infrastructure layer - External service implementations

pub mod blob;
pub mod detection;
pub mod logging;
pub mod observability;
pub mod queue;
pub mod result;
