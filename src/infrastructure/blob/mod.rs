//! Blob storage infrastructure - GCS backend, token sources and test doubles

mod gcs;
mod in_memory;
mod lazy;
mod token;

pub use gcs::GcsBlobStorage;
pub use in_memory::InMemoryBlobStorage;
pub use lazy::LazyBlobStorage;
pub use token::{ServiceAccountKey, ServiceAccountTokenSource, StaticTokenSource, TokenSource};
