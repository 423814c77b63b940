//! Decoding of YOLO output tensors and non-maximum suppression

use crate::domain::{BoundingBox, DomainError};

/// Box candidate in model input coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: u32,
    pub score: f32,
    pub bbox: BoundingBox,
}

/// Decode a `[1, 4 + classes, anchors]` tensor (or its transpose
/// `[1, anchors, 4 + classes]`) into candidates above `confidence`
///
/// Rows hold `cx, cy, w, h` followed by per-class scores.
pub fn decode_predictions(
    shape: &[i64],
    data: &[f32],
    confidence: f32,
) -> Result<Vec<Candidate>, DomainError> {
    let (rows, cols) = match shape {
        [1, rows, cols] if *rows > 0 && *cols > 0 => (*rows as usize, *cols as usize),
        _ => {
            return Err(DomainError::detection(format!(
                "Unexpected output shape {:?}, expected [1, 4 + classes, anchors]",
                shape
            )));
        }
    };

    // anchors always outnumber channels for real models
    let channels_first = rows < cols;
    let (channels, anchors) = if channels_first {
        (rows, cols)
    } else {
        (cols, rows)
    };

    if channels <= 4 {
        return Err(DomainError::detection(format!(
            "Output has {} channels, expected box coordinates plus class scores",
            channels
        )));
    }

    if data.len() != channels * anchors {
        return Err(DomainError::detection(format!(
            "Output holds {} values, shape {:?} needs {}",
            data.len(),
            shape,
            channels * anchors
        )));
    }

    let value = |channel: usize, anchor: usize| -> f32 {
        if channels_first {
            data[channel * anchors + anchor]
        } else {
            data[anchor * channels + channel]
        }
    };

    let mut candidates = Vec::new();

    for anchor in 0..anchors {
        let (class_id, score) = (4..channels)
            .map(|channel| (channel - 4, value(channel, anchor)))
            .fold((0usize, f32::MIN), |best, current| {
                if current.1 > best.1 { current } else { best }
            });

        if score < confidence {
            continue;
        }

        candidates.push(Candidate {
            class_id: class_id as u32,
            score,
            bbox: BoundingBox::from_center(
                value(0, anchor),
                value(1, anchor),
                value(2, anchor),
                value(3, anchor),
            ),
        });
    }

    Ok(candidates)
}

/// Class-aware greedy NMS, highest score first, capped at `max_detections`
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();

    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(class_id: u32, score: f32, bbox: [f32; 4]) -> Candidate {
        Candidate {
            class_id,
            score,
            bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
        }
    }

    #[test]
    fn test_decode_channels_first() {
        // 2 classes, 7 anchors: rows are cx, cy, w, h, cls0, cls1
        let data = vec![
            10.0, 50.0, 90.0, 0.0, 0.0, 0.0, 0.0, // cx
            10.0, 50.0, 90.0, 0.0, 0.0, 0.0, 0.0, // cy
            4.0, 10.0, 6.0, 0.0, 0.0, 0.0, 0.0, // w
            4.0, 10.0, 6.0, 0.0, 0.0, 0.0, 0.0, // h
            0.9, 0.1, 0.2, 0.0, 0.0, 0.0, 0.0, // class 0
            0.05, 0.8, 0.1, 0.0, 0.0, 0.0, 0.0, // class 1
        ];

        let candidates = decode_predictions(&[1, 6, 7], &data, 0.25).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].class_id, 0);
        assert!((candidates[0].score - 0.9).abs() < 1e-6);
        assert_eq!(candidates[0].bbox, BoundingBox::new(8.0, 8.0, 12.0, 12.0));
        assert_eq!(candidates[1].class_id, 1);
        assert_eq!(candidates[1].bbox, BoundingBox::new(45.0, 45.0, 55.0, 55.0));
    }

    #[test]
    fn test_decode_anchors_first() {
        // 6 anchors x (4 + 1 class)
        let mut data = vec![0.0f32; 6 * 5];
        data[2 * 5..3 * 5].copy_from_slice(&[20.0, 30.0, 10.0, 20.0, 0.7]);

        let candidates = decode_predictions(&[1, 6, 5], &data, 0.5).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].class_id, 0);
        assert_eq!(candidates[0].bbox, BoundingBox::new(15.0, 20.0, 25.0, 40.0));
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_predictions(&[6, 3], &[0.0; 18], 0.25).is_err());
        assert!(decode_predictions(&[1, 4, 10], &[0.0; 40], 0.25).is_err());
        assert!(decode_predictions(&[1, 6, 7], &[0.0; 10], 0.25).is_err());
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let kept = non_max_suppression(
            vec![
                candidate(0, 0.6, [0.0, 0.0, 10.0, 10.0]),
                candidate(0, 0.9, [1.0, 1.0, 11.0, 11.0]),
            ],
            0.5,
            300,
        );

        assert_eq!(kept.len(), 1);
        assert!((kept[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_other_classes() {
        let kept = non_max_suppression(
            vec![
                candidate(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
                candidate(1, 0.8, [0.0, 0.0, 10.0, 10.0]),
            ],
            0.5,
            300,
        );

        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_keeps_distant_boxes_and_caps_count() {
        let candidates = (0..5)
            .map(|i| {
                let x = i as f32 * 20.0;
                candidate(0, 0.5 + i as f32 * 0.1, [x, 0.0, x + 10.0, 10.0])
            })
            .collect();

        let kept = non_max_suppression(candidates, 0.5, 3);

        assert_eq!(kept.len(), 3);
        assert!(kept[0].score > kept[1].score && kept[1].score > kept[2].score);
    }
}
