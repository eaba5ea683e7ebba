//! SSD face detector adapter.
//!
//! Feeds the whole frame to the detector at its fixed input size and decodes
//! the `[N, 7]` detection table into frame-space [`FaceBox`]es.

use crate::models::{first_output, infer_single, ModelError};
use crate::preprocess::{preprocess, ChannelOrder};
use crate::provider::InferenceSession;
use crate::types::FaceBox;
use image::RgbImage;

// --- Named constants (no magic numbers) ---
pub const DETECTOR_INPUT_HEIGHT: usize = 384;
pub const DETECTOR_INPUT_WIDTH: usize = 672;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
/// `[image_id, label, confidence, x_min, y_min, x_max, y_max]`
const DETECTION_ROW_LEN: usize = 7;
const CONFIDENCE_COL: usize = 2;

pub struct FaceDetector {
    session: Box<dyn InferenceSession>,
    input_height: usize,
    input_width: usize,
}

impl FaceDetector {
    pub fn new(session: Box<dyn InferenceSession>) -> Self {
        Self::with_input_size(session, DETECTOR_INPUT_HEIGHT, DETECTOR_INPUT_WIDTH)
    }

    pub fn with_input_size(
        session: Box<dyn InferenceSession>,
        input_height: usize,
        input_width: usize,
    ) -> Self {
        Self {
            session,
            input_height,
            input_width,
        }
    }

    /// Detect faces, returning boxes in the detector's raw row order.
    ///
    /// No sorting or suppression is applied: when detections overlap, which
    /// one comes first is whatever the model emitted.
    pub fn detect(
        &mut self,
        frame: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<FaceBox>, ModelError> {
        let input = preprocess(frame, self.input_height, self.input_width, ChannelOrder::Bgr)?;
        let outputs = infer_single(self.session.as_mut(), &input)?;
        let raw = first_output(&outputs)?;

        let boxes = decode_detections(&raw, frame.width(), frame.height(), confidence_threshold);
        tracing::debug!(
            rows = raw.len() / DETECTION_ROW_LEN,
            kept = boxes.len(),
            "face detection decoded"
        );
        Ok(boxes)
    }
}

/// Decode a flat detection table into clipped frame-space boxes.
fn decode_detections(raw: &[f32], frame_width: u32, frame_height: u32, threshold: f32) -> Vec<FaceBox> {
    let remainder = raw.len() % DETECTION_ROW_LEN;
    if remainder != 0 {
        tracing::warn!(
            len = raw.len(),
            remainder,
            "detection output is not a whole number of rows; ignoring the tail"
        );
    }

    raw.chunks_exact(DETECTION_ROW_LEN)
        .filter(|row| row[CONFIDENCE_COL] > threshold)
        .map(|row| FaceBox::from_normalized([row[3], row[4], row[5], row[6]], frame_width, frame_height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{tensor, StubSession};
    use image::Rgb;

    fn row(conf: f32, coords: [f32; 4]) -> [f32; 7] {
        [0.0, 1.0, conf, coords[0], coords[1], coords[2], coords[3]]
    }

    fn table(rows: &[[f32; 7]]) -> Vec<f32> {
        rows.iter().flatten().copied().collect()
    }

    #[test]
    fn test_threshold_is_strict() {
        let raw = table(&[
            row(0.5, [0.1, 0.1, 0.5, 0.5]),
            row(0.51, [0.2, 0.2, 0.6, 0.6]),
        ]);
        let boxes = decode_detections(&raw, 100, 100, 0.5);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].x_min, 20);
    }

    #[test]
    fn test_scales_by_frame_size() {
        let raw = table(&[row(0.9, [0.25, 0.5, 0.75, 1.0])]);
        let boxes = decode_detections(&raw, 640, 480, 0.5);
        assert_eq!(boxes, vec![FaceBox::new(160, 240, 480, 480)]);
    }

    #[test]
    fn test_boxes_stay_inside_frame() {
        let raw = table(&[
            row(0.9, [-0.5, -0.1, 1.5, 2.0]),
            row(0.8, [0.9, 0.9, 1.01, 1.2]),
        ]);
        for b in decode_detections(&raw, 320, 240, 0.5) {
            assert!(0 <= b.x_min && b.x_min <= b.x_max && b.x_max <= 320);
            assert!(0 <= b.y_min && b.y_min <= b.y_max && b.y_max <= 240);
        }
    }

    #[test]
    fn test_row_order_preserved() {
        // Lower confidence first: no sort is applied.
        let raw = table(&[
            row(0.6, [0.5, 0.5, 0.9, 0.9]),
            row(0.99, [0.1, 0.1, 0.4, 0.4]),
        ]);
        let boxes = decode_detections(&raw, 100, 100, 0.5);
        assert_eq!(boxes[0].x_min, 50);
        assert_eq!(boxes[1].x_min, 10);
    }

    #[test]
    fn test_partial_row_ignored() {
        let mut raw = table(&[row(0.9, [0.1, 0.1, 0.4, 0.4])]);
        raw.extend_from_slice(&[0.0, 1.0, 0.99]);
        assert_eq!(decode_detections(&raw, 100, 100, 0.5).len(), 1);
    }

    #[test]
    fn test_empty_table() {
        assert!(decode_detections(&[], 100, 100, 0.5).is_empty());
    }

    #[test]
    fn test_detect_feeds_fixed_input_size() {
        let stub = StubSession::new(
            &["data"],
            vec![tensor(
                "detection_out",
                &[1, 1, 2, 7],
                table(&[row(0.9, [0.1, 0.1, 0.905, 0.905]), row(0.1, [0.0, 0.0, 1.0, 1.0])]),
            )],
        );
        let seen = stub.seen.clone();
        let mut detector = FaceDetector::new(Box::new(stub));

        let frame = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let boxes = detector.detect(&frame, DEFAULT_CONFIDENCE_THRESHOLD).unwrap();

        assert_eq!(boxes, vec![FaceBox::new(10, 10, 90, 90)]);
        let calls = seen.lock().unwrap();
        assert_eq!(
            calls[0][0].1,
            vec![1, 3, DETECTOR_INPUT_HEIGHT, DETECTOR_INPUT_WIDTH]
        );
    }
}
