//! Result reporting infrastructure

mod http_reporter;

pub use http_reporter::HttpResultReporter;
