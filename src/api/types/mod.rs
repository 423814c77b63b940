//! API request, response and error types

pub mod error;
pub mod images;
pub mod json;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use images::{MessageResponse, ProcessImageRequest, ProcessImageResponse};
pub use json::Json;
