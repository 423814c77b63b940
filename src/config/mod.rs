//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, DEFAULT_FONT_PATH, ExternalApiConfig, LogFormat, LoggingConfig, MetricsConfig,
    ModelConfig, QueueConfig, ServerConfig, StorageConfig,
};
