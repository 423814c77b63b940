//! YOLO detector backed by ONNX Runtime

use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::domain::{Detection, Detector, DomainError};

use super::labels::ClassLabels;
use super::letterbox::{Letterbox, letterbox};
use super::postprocess::{decode_predictions, non_max_suppression};

#[derive(Debug, Clone, Copy)]
struct DetectionParams {
    input_size: u32,
    confidence: f32,
    iou: f32,
    max_detections: usize,
}

impl From<&ModelConfig> for DetectionParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            input_size: config.input_size,
            confidence: config.confidence_threshold,
            iou: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

/// Single-session YOLO detector
///
/// `Session::run` needs exclusive access, so concurrent callers are
/// serialized on the session lock.
pub struct OnnxDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    labels: ClassLabels,
    params: DetectionParams,
}

impl std::fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("labels", &self.labels.len())
            .field("params", &self.params)
            .finish()
    }
}

fn ort_error<E: Display>(context: &'static str) -> impl Fn(E) -> DomainError {
    move |e| DomainError::detection(format!("{}: {}", context, e))
}

impl OnnxDetector {
    /// Load the model and labels named by `config`
    pub fn load(config: &ModelConfig) -> Result<Self, DomainError> {
        let path = Path::new(&config.path);
        if !path.is_file() {
            return Err(DomainError::configuration(format!(
                "Detection model not found at {}",
                config.path
            )));
        }

        let mut builder = Session::builder()
            .map_err(ort_error("Failed to create session builder"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort_error("Failed to set optimization level"))?;

        if config.intra_threads > 0 {
            builder = builder
                .with_intra_threads(config.intra_threads)
                .map_err(ort_error("Failed to set intra-op threads"))?;
        }

        let session = builder
            .commit_from_file(path)
            .map_err(ort_error("Failed to load detection model"))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| DomainError::detection("Detection model has no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| DomainError::detection("Detection model has no outputs"))?;

        let labels = match &config.labels_path {
            Some(labels_path) => ClassLabels::from_file(labels_path)?,
            None => embedded_labels(&session).unwrap_or_default(),
        };

        info!(
            path = %config.path,
            input = %input_name,
            output = %output_name,
            classes = labels.len(),
            input_size = config.input_size,
            "Detection model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            labels,
            params: DetectionParams::from(config),
        })
    }

    fn infer(&self, input: Vec<f32>) -> Result<(Vec<i64>, Vec<f32>), DomainError> {
        let size = self.params.input_size as usize;
        let tensor = Tensor::from_array(([1usize, 3, size, size], input))
            .map_err(ort_error("Failed to build input tensor"))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DomainError::internal("Detection session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(ort_error("Inference failed"))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(ort_error("Failed to read model output"))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}

/// Class names stored by the exporter in the model's `names` metadata
fn embedded_labels(session: &Session) -> Option<ClassLabels> {
    match session.metadata().and_then(|metadata| metadata.custom("names")) {
        Ok(Some(names)) => {
            let labels = ClassLabels::from_names_map(&names);
            if labels.is_none() {
                warn!("Unreadable class names in model metadata");
            }
            labels
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Failed to read model metadata");
            None
        }
    }
}

/// Raw model output to labelled detections in source image pixels
fn to_detections(
    shape: &[i64],
    data: &[f32],
    geometry: &Letterbox,
    labels: &ClassLabels,
    params: &DetectionParams,
) -> Result<Vec<Detection>, DomainError> {
    let candidates = decode_predictions(shape, data, params.confidence)?;
    let kept = non_max_suppression(candidates, params.iou, params.max_detections);

    Ok(kept
        .into_iter()
        .map(|candidate| Detection {
            class_id: candidate.class_id,
            label: labels.name(candidate.class_id),
            score: candidate.score,
            bbox: geometry.to_source(&candidate.bbox),
        })
        .filter(|detection| detection.bbox.area() > 0.0)
        .collect())
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DomainError> {
        let (input, geometry) = letterbox(image, self.params.input_size);
        let (shape, data) = self.infer(input)?;

        let detections = to_detections(&shape, &data, &geometry, &self.labels, &self.params)?;
        debug!(
            width = image.width(),
            height = image.height(),
            detections = detections.len(),
            "Inference complete"
        );

        Ok(detections)
    }

    fn warm_up(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BoundingBox;

    fn config(path: &str) -> ModelConfig {
        ModelConfig {
            path: path.to_string(),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_load_missing_model() {
        let err = OnnxDetector::load(&config("/nonexistent/model.onnx")).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Configuration error: Detection model not found at /nonexistent/model.onnx"
        );
    }

    #[test]
    fn test_load_rejects_invalid_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();

        let err = OnnxDetector::load(&config(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, DomainError::Detection { .. }));
    }

    #[test]
    fn test_params_from_config() {
        let params = DetectionParams::from(&ModelConfig {
            input_size: 320,
            confidence_threshold: 0.4,
            iou_threshold: 0.5,
            max_detections: 10,
            ..ModelConfig::default()
        });

        assert_eq!(params.input_size, 320);
        assert_eq!(params.max_detections, 10);
        assert!((params.confidence - 0.4).abs() < f32::EPSILON);
    }

    fn params() -> DetectionParams {
        DetectionParams::from(&ModelConfig::default())
    }

    /// `[1, 6, 8]` output: two classes, eight anchors, channels first
    fn output(anchors: &[(f32, f32, f32, f32, f32, f32)]) -> (Vec<i64>, Vec<f32>) {
        const ANCHORS: usize = 8;
        let mut data = vec![0.0f32; 6 * ANCHORS];
        for (anchor, &(cx, cy, w, h, s0, s1)) in anchors.iter().enumerate() {
            for (channel, value) in [cx, cy, w, h, s0, s1].into_iter().enumerate() {
                data[channel * ANCHORS + anchor] = value;
            }
        }
        (vec![1, 6, ANCHORS as i64], data)
    }

    #[test]
    fn test_to_detections_maps_to_source_space() {
        // 1280x640 source: scale 0.5, 160 px of padding above and below
        let geometry = Letterbox::fit(1280, 640, 640);
        let labels = ClassLabels::new(vec!["pneu".to_string(), "vaso".to_string()]);
        let (shape, data) = output(&[
            (75.0, 277.5, 50.0, 25.0, 0.1, 0.9),
            // entirely inside the top padding
            (100.0, 50.0, 20.0, 20.0, 0.8, 0.0),
            (300.0, 300.0, 40.0, 40.0, 0.1, 0.2),
        ]);

        let detections = to_detections(&shape, &data, &geometry, &labels, &params()).unwrap();

        assert_eq!(detections.len(), 1);
        let detection = &detections[0];
        assert_eq!(detection.class_id, 1);
        assert_eq!(detection.label, "vaso");
        assert!((detection.score - 0.9).abs() < f32::EPSILON);
        assert_eq!(detection.bbox, BoundingBox::new(100.0, 210.0, 200.0, 260.0));
    }

    #[test]
    fn test_to_detections_suppresses_overlaps_and_names_unknown_classes() {
        let geometry = Letterbox::fit(640, 640, 640);
        let (shape, data) = output(&[
            (100.0, 100.0, 40.0, 40.0, 0.7, 0.0),
            (101.0, 100.0, 40.0, 40.0, 0.6, 0.0),
            (400.0, 400.0, 20.0, 20.0, 0.0, 0.5),
        ]);

        let detections =
            to_detections(&shape, &data, &geometry, &ClassLabels::default(), &params()).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "class 0");
        assert_eq!(detections[0].bbox, BoundingBox::new(80.0, 80.0, 120.0, 120.0));
        assert_eq!(detections[1].label, "class 1");
    }

    #[test]
    fn test_to_detections_rejects_bad_shape() {
        let geometry = Letterbox::fit(640, 640, 640);

        let err = to_detections(&[1, 6], &[0.0; 6], &geometry, &ClassLabels::default(), &params())
            .unwrap_err();
        assert!(matches!(err, DomainError::Detection { .. }));
    }
}
