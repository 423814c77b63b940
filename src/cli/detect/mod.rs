//! Detect command - annotates a local image without the queue

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::config::{AppConfig, ModelConfig};
use crate::domain::{Detection, Detector};
use crate::infrastructure::detection::{ImageAnnotator, OnnxDetector};
use crate::infrastructure::logging;

/// Arguments for the detect command
#[derive(Args, Clone, Debug)]
pub struct DetectArgs {
    /// Image file to analyse
    pub input: PathBuf,

    /// Write the annotated JPEG here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// ONNX model path (overrides config)
    #[arg(long)]
    pub model: Option<String>,

    /// Confidence threshold (overrides config)
    #[arg(long)]
    pub confidence: Option<f32>,
}

#[derive(Serialize)]
struct DetectionLine<'a> {
    label: &'a str,
    class_id: u32,
    score: f32,
    bbox: [f32; 4],
}

impl<'a> From<&'a Detection> for DetectionLine<'a> {
    fn from(detection: &'a Detection) -> Self {
        Self {
            label: &detection.label,
            class_id: detection.class_id,
            score: detection.score,
            bbox: [
                detection.bbox.x_min,
                detection.bbox.y_min,
                detection.bbox.x_max,
                detection.bbox.y_max,
            ],
        }
    }
}

/// Print one JSON object per detection on stdout
pub async fn run(args: DetectArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let model = model_config(&config.model, &args);
    let data = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let processed = tokio::task::spawn_blocking(move || {
        let detector: Arc<dyn Detector> = Arc::new(OnnxDetector::load(&model)?);
        ImageAnnotator::from_config(detector, &model).process(&data)
    })
    .await??;

    for detection in &processed.detections {
        println!("{}", serde_json::to_string(&DetectionLine::from(detection))?);
    }

    if let Some(output) = &args.output {
        tokio::fs::write(output, &processed.bytes)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!(path = %output.display(), "Annotated image written");
    }

    info!(
        input = %args.input.display(),
        detected = processed.detected_count(),
        "Detection complete"
    );

    Ok(())
}

fn model_config(base: &ModelConfig, args: &DetectArgs) -> ModelConfig {
    let mut model = base.clone();
    if let Some(path) = &args.model {
        model.path = path.clone();
    }
    if let Some(confidence) = args.confidence {
        model.confidence_threshold = confidence.clamp(0.0, 1.0);
    }
    model
}
