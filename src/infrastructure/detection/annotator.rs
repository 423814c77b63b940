//! Runs detection on encoded images and draws the results

use std::io::Cursor;
use std::sync::Arc;

use ab_glyph::{FontVec, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::domain::{Detection, Detector, DomainError, ProcessedImage};

const PALETTE: [[u8; 3]; 20] = [
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_PADDING: i32 = 2;

pub fn class_color(class_id: u32) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

/// Decodes an image, runs the detector, draws boxes and re-encodes as JPEG
pub struct ImageAnnotator {
    detector: Arc<dyn Detector>,
    font: Option<FontVec>,
    jpeg_quality: u8,
}

impl std::fmt::Debug for ImageAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAnnotator")
            .field("font", &self.font.is_some())
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

impl ImageAnnotator {
    pub fn new(detector: Arc<dyn Detector>, font: Option<FontVec>, jpeg_quality: u8) -> Self {
        Self {
            detector,
            font,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Build from model settings; an unreadable font disables box labels
    pub fn from_config(detector: Arc<dyn Detector>, config: &ModelConfig) -> Self {
        let font = config.font_path.as_deref().and_then(|path| {
            match std::fs::read(path)
                .map_err(|e| e.to_string())
                .and_then(|data| FontVec::try_from_vec(data).map_err(|e| e.to_string()))
            {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to load label font, labels disabled");
                    None
                }
            }
        });

        Self::new(detector, font, config.jpeg_quality)
    }

    /// Whether boxes get a class name and score label
    pub fn draws_labels(&self) -> bool {
        self.font.is_some()
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.detector
    }

    /// Full pipeline over encoded image bytes
    pub fn process(&self, data: &[u8]) -> Result<ProcessedImage, DomainError> {
        let mut image = image::load_from_memory(data)
            .map_err(|e| DomainError::validation(format!("Failed to decode image: {}", e)))?
            .to_rgb8();

        let detections = self.detector.detect(&image)?;
        debug!(
            width = image.width(),
            height = image.height(),
            detections = detections.len(),
            "Annotating image"
        );

        self.draw_detections(&mut image, &detections);
        let bytes = self.encode_jpeg(&image)?;

        Ok(ProcessedImage { bytes, detections })
    }

    pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return;
        }

        let thickness = line_width(width, height);
        let font_scale = PxScale::from(font_size(width, height));

        for detection in detections {
            let color = class_color(detection.class_id);
            let bbox = detection.bbox.clamp(width as f32, height as f32);

            let x_min = bbox.x_min.floor() as i32;
            let y_min = bbox.y_min.floor() as i32;
            let x_max = (bbox.x_max.ceil() as i32).min(width as i32 - 1);
            let y_max = (bbox.y_max.ceil() as i32).min(height as i32 - 1);

            if x_min >= x_max || y_min >= y_max {
                continue;
            }

            for inset in 0..thickness {
                let w = x_max - x_min - 2 * inset;
                let h = y_max - y_min - 2 * inset;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(x_min + inset, y_min + inset).of_size(w as u32 + 1, h as u32 + 1);
                draw_hollow_rect_mut(image, rect, color);
            }

            if let Some(font) = &self.font {
                let label = format!("{} {:.2}", detection.label, detection.score);
                let (text_w, text_h) = text_size(font_scale, font, &label);
                let box_h = text_h as i32 + 2 * LABEL_PADDING;
                let box_w = (text_w as i32 + 2 * LABEL_PADDING).min(width as i32 - x_min);

                // above the box when it fits, inside otherwise
                let label_y = if y_min >= box_h { y_min - box_h } else { y_min };

                if box_w > 0 {
                    let rect = Rect::at(x_min, label_y).of_size(box_w as u32, box_h as u32);
                    draw_filled_rect_mut(image, rect, color);
                    draw_text_mut(
                        image,
                        TEXT_COLOR,
                        x_min + LABEL_PADDING,
                        label_y + LABEL_PADDING,
                        font_scale,
                        font,
                        &label,
                    );
                }
            }
        }
    }

    fn encode_jpeg(&self, image: &RgbImage) -> Result<Vec<u8>, DomainError> {
        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality)
            .encode_image(image)
            .map_err(|e| DomainError::internal(format!("Failed to encode image: {}", e)))?;

        Ok(buffer.into_inner())
    }
}

/// Box outline width scaled to the image, never below 2px
pub fn line_width(width: u32, height: u32) -> i32 {
    (((width + height) as f32 / 2.0 * 0.003).round() as i32).max(2)
}

fn font_size(width: u32, height: u32) -> f32 {
    ((width + height) as f32 / 2.0 * 0.035).round().max(12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::MockDetector;
    use crate::domain::BoundingBox;
    use image::ImageFormat;

    fn detection(class_id: u32, bbox: [f32; 4]) -> Detection {
        Detection {
            class_id,
            label: "pneu".to_string(),
            score: 0.87,
            bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn annotator(detector: MockDetector) -> ImageAnnotator {
        ImageAnnotator::new(Arc::new(detector), None, 90)
    }

    #[test]
    fn test_line_width() {
        assert_eq!(line_width(100, 100), 2);
        assert_eq!(line_width(1920, 1080), 5);
    }

    #[test]
    fn test_class_color_wraps_palette() {
        assert_eq!(class_color(0), Rgb([0xFF, 0x38, 0x38]));
        assert_eq!(class_color(20), class_color(0));
    }

    #[test]
    fn test_process_returns_jpeg_and_detections() {
        let mut detector = MockDetector::new();
        detector
            .expect_detect()
            .times(1)
            .returning(|_| Ok(vec![detection(0, [10.0, 10.0, 40.0, 40.0])]));

        let processed = annotator(detector).process(&png_bytes(64, 48)).unwrap();

        assert_eq!(processed.detected_count(), 1);
        // JPEG SOI marker
        assert_eq!(&processed.bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&processed.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_process_without_detections() {
        let mut detector = MockDetector::new();
        detector.expect_detect().returning(|_| Ok(vec![]));

        let processed = annotator(detector).process(&png_bytes(16, 16)).unwrap();
        assert_eq!(processed.detected_count(), 0);
        assert!(!processed.bytes.is_empty());
    }

    #[test]
    fn test_process_rejects_undecodable_bytes() {
        let mut detector = MockDetector::new();
        detector.expect_detect().times(0);

        let err = annotator(detector).process(b"definitely not an image").unwrap_err();
        assert!(err.to_string().contains("Failed to decode image"));
    }

    #[test]
    fn test_process_propagates_detector_failure() {
        let mut detector = MockDetector::new();
        detector
            .expect_detect()
            .returning(|_| Err(DomainError::detection("session exploded")));

        let err = annotator(detector).process(&png_bytes(16, 16)).unwrap_err();
        assert!(matches!(err, DomainError::Detection { .. }));
    }

    #[test]
    fn test_draw_detections_outlines_box() {
        let annotator = annotator(MockDetector::new());
        let mut image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));

        annotator.draw_detections(&mut image, &[detection(0, [10.0, 10.0, 50.0, 50.0])]);

        let color = class_color(0);
        assert_eq!(*image.get_pixel(10, 30), color);
        assert_eq!(*image.get_pixel(11, 30), color);
        assert_eq!(*image.get_pixel(50, 30), color);
        assert_eq!(*image.get_pixel(30, 10), color);
        // interior untouched
        assert_eq!(*image.get_pixel(30, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_detections_skips_degenerate_boxes() {
        let annotator = annotator(MockDetector::new());
        let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));

        annotator.draw_detections(
            &mut image,
            &[detection(1, [5.0, 5.0, 5.0, 15.0]), detection(1, [30.0, 30.0, 40.0, 40.0])],
        );

        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_from_config_without_readable_font_skips_labels() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_font = dir.path().join("font.ttf");
        std::fs::write(&not_a_font, b"not a font").unwrap();

        for font_path in [
            None,
            Some("/nonexistent/font.ttf".to_string()),
            Some(not_a_font.to_string_lossy().into_owned()),
        ] {
            let config = ModelConfig {
                font_path,
                ..ModelConfig::default()
            };
            let annotator = ImageAnnotator::from_config(Arc::new(MockDetector::new()), &config);

            assert!(!annotator.draws_labels());
        }
    }
}
