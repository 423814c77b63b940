//! Blob domain - Image locations and the blob storage port

mod location;
mod storage;

pub use location::BlobLocation;
pub use storage::BlobStorage;
