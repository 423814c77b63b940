//! Object detection infrastructure: ONNX inference and image annotation

mod annotator;
mod labels;
mod lazy;
mod letterbox;
mod onnx;
mod postprocess;

pub use annotator::{ImageAnnotator, class_color, line_width};
pub use labels::ClassLabels;
pub use lazy::LazyDetector;
pub use letterbox::{Letterbox, letterbox};
pub use onnx::OnnxDetector;
pub use postprocess::{Candidate, decode_predictions, non_max_suppression};
