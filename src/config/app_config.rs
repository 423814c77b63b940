use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub external_api: ExternalApiConfig,
    pub queue: QueueConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Google Cloud Storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub project_id: String,
    /// Path to a service account key file
    pub credentials_path: String,
    pub api_base_url: String,
    /// Prefix of the public URLs returned for uploaded objects
    pub public_base_url: String,
    /// Folder that receives annotated images
    pub processed_prefix: String,
    pub timeout_secs: u64,
}

/// Label font installed by the `fonts-dejavu-core` package
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// Detection model settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX export of the detection model
    pub path: String,
    /// Class names, one per line; the model's own metadata is used without it
    pub labels_path: Option<String>,
    /// TTF/OTF font used for box labels; labels are skipped without one
    pub font_path: Option<String>,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub jpeg_quality: u8,
    /// ONNX Runtime intra-op threads, 0 lets the runtime decide
    pub intra_threads: usize,
}

/// Results API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExternalApiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_workers: usize,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            project_id: String::new(),
            credentials_path: String::new(),
            api_base_url: "https://storage.googleapis.com".to_string(),
            public_base_url: "https://storage.googleapis.com".to_string(),
            processed_prefix: "processed".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "detection_model/model.onnx".to_string(),
            labels_path: None,
            font_path: Some(DEFAULT_FONT_PATH.to_string()),
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            jpeg_quality: 90,
            intra_threads: 0,
        }
    }
}

impl Default for ExternalApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            shutdown_timeout_secs: 30,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Flat variable names used by earlier deployments, mapped to config keys
const LEGACY_ENV_KEYS: [(&str, &str); 7] = [
    ("GCP_STORAGE_BUCKET_NAME", "storage.bucket"),
    ("GCP_PROJECT_ID", "storage.project_id"),
    ("GCP_CREDENTIALS_PATH", "storage.credentials_path"),
    ("YOLO_MODEL_PATH", "model.path"),
    ("EXTERNAL_API_URL", "external_api.url"),
    ("EXTERNAL_API_KEY", "external_api.api_key"),
    ("QUEUE_MAX_WORKERS", "queue.max_workers"),
];

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration, resolving legacy variables through `lookup`
    pub fn load_with<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (name, key) in LEGACY_ENV_KEYS {
            let Some(value) = lookup(name) else {
                continue;
            };

            builder = if key == "queue.max_workers" {
                let workers = value.trim().parse::<i64>().map_err(|_| {
                    config::ConfigError::Message(format!(
                        "{} must be an integer, got '{}'",
                        name, value
                    ))
                })?;
                builder.set_override(key, workers)?
            } else {
                builder.set_override(key, value)?
            };
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.queue.max_workers == 0 {
            return Err(config::ConfigError::Message(
                "queue.max_workers must be at least 1".to_string(),
            ));
        }

        if self.model.input_size == 0 || self.model.input_size % 32 != 0 {
            return Err(config::ConfigError::Message(format!(
                "model.input_size must be a positive multiple of 32, got {}",
                self.model.input_size
            )));
        }

        if !(0.0..=1.0).contains(&self.model.confidence_threshold)
            || !(0.0..=1.0).contains(&self.model.iou_threshold)
        {
            return Err(config::ConfigError::Message(
                "model thresholds must be within [0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}
