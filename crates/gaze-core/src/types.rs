use crate::geometry::{FaceSpace, NormalizedPoint, PixelPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of points produced by the landmark regressor.
pub const LANDMARK_POINTS: usize = 35;
/// Flattened length of a landmark output (x, y per point).
pub const LANDMARK_VALUES: usize = LANDMARK_POINTS * 2;

/// Face bounding box in frame pixels. `x_max`/`y_max` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl FaceBox {
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Build a box from normalized detector coordinates, scaling by the frame
    /// size (truncating) and clipping to `[0, width] × [0, height]`.
    pub fn from_normalized(coords: [f32; 4], frame_width: u32, frame_height: u32) -> Self {
        let (w, h) = (frame_width as i32, frame_height as i32);
        let x_min = ((coords[0] * frame_width as f32) as i32).clamp(0, w);
        let y_min = ((coords[1] * frame_height as f32) as i32).clamp(0, h);
        let x_max = ((coords[2] * frame_width as f32) as i32).clamp(0, w);
        let y_max = ((coords[3] * frame_height as f32) as i32).clamp(0, h);

        // Inverted detections collapse to zero area instead of breaking ordering.
        Self {
            x_min,
            y_min,
            x_max: x_max.max(x_min),
            y_max: y_max.max(y_min),
        }
    }

    pub fn width(&self) -> u32 {
        (self.x_max - self.x_min).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y_max - self.y_min).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.x_min + self.x_max) / 2, (self.y_min + self.y_max) / 2)
    }
}

/// 35 facial landmarks, normalized to the face crop, in model order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    /// Flattened `[x0, y0, x1, y1, ...]`, exactly [`LANDMARK_VALUES`] long.
    values: Vec<f32>,
}

impl LandmarkSet {
    /// Wrap a flattened landmark vector. Returns `None` unless it holds
    /// exactly [`LANDMARK_VALUES`] floats.
    pub fn from_flat(values: Vec<f32>) -> Option<Self> {
        (values.len() == LANDMARK_VALUES).then_some(Self { values })
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.values
    }

    pub fn point(&self, index: usize) -> NormalizedPoint<FaceSpace> {
        NormalizedPoint::new(self.values[index * 2], self.values[index * 2 + 1])
    }

    pub fn points(&self) -> impl Iterator<Item = NormalizedPoint<FaceSpace>> + '_ {
        self.values
            .chunks_exact(2)
            .map(|xy| NormalizedPoint::new(xy[0], xy[1]))
    }

    /// Midpoint of the two left-eye corner points (points 0 and 1).
    pub fn left_eye_center(&self) -> NormalizedPoint<FaceSpace> {
        NormalizedPoint::midpoint(self.point(0), self.point(1))
    }

    /// Midpoint of the two right-eye corner points (points 2 and 3).
    pub fn right_eye_center(&self) -> NormalizedPoint<FaceSpace> {
        NormalizedPoint::midpoint(self.point(2), self.point(3))
    }
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Female => f.write_str("Female"),
            Gender::Male => f.write_str("Male"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGender {
    /// Estimated age in years, `0..=100`.
    pub age: u8,
    pub gender: Gender,
}

impl Default for AgeGender {
    fn default() -> Self {
        Self {
            age: 0,
            gender: Gender::Female,
        }
    }
}

/// Emotion classes in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Surprise,
    Anger,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Anger,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Anger => "anger",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gaze direction in the model's frame (x right, y down, z forward).
/// Not normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeVector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Eye centers in face-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeCenters {
    pub left: PixelPoint<FaceSpace>,
    pub right: PixelPoint<FaceSpace>,
}

/// Everything the pipeline derived for one face in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceResult {
    pub face_box: FaceBox,
    pub landmarks: LandmarkSet,
    pub head_pose: HeadPose,
    /// Absent when either eye crop was degenerate.
    pub gaze: Option<GazeVector>,
    pub eyes: EyeCenters,
    pub age_gender: AgeGender,
    pub emotion: Emotion,
}

/// Output of one pipeline run, in detector order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameResult {
    pub faces: Vec<FaceResult>,
}

impl FrameResult {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_landmarks() -> Vec<f32> {
        let mut values = vec![0.5f32; LANDMARK_VALUES];
        values[..8].copy_from_slice(&[0.25, 0.375, 0.375, 0.375, 0.625, 0.375, 0.75, 0.375]);
        values
    }

    #[test]
    fn test_face_box_clips_to_frame() {
        let b = FaceBox::from_normalized([-0.1, -0.2, 1.3, 1.1], 100, 50);
        assert_eq!(b, FaceBox::new(0, 0, 100, 50));
    }

    #[test]
    fn test_face_box_truncates() {
        let b = FaceBox::from_normalized([0.1, 0.1, 0.905, 0.905], 100, 100);
        assert_eq!(b, FaceBox::new(10, 10, 90, 90));
    }

    #[test]
    fn test_face_box_inverted_collapses() {
        let b = FaceBox::from_normalized([0.8, 0.5, 0.2, 0.6], 100, 100);
        assert!(b.x_min <= b.x_max);
        assert!(b.is_empty());
    }

    #[test]
    fn test_face_box_zero_area() {
        assert!(FaceBox::new(10, 10, 10, 40).is_empty());
        assert!(FaceBox::new(10, 10, 40, 10).is_empty());
        assert!(!FaceBox::new(10, 10, 11, 11).is_empty());
    }

    #[test]
    fn test_landmarks_require_exact_length() {
        assert!(LandmarkSet::from_flat(vec![0.0; 69]).is_none());
        assert!(LandmarkSet::from_flat(vec![0.0; 71]).is_none());
        assert!(LandmarkSet::from_flat(vec![0.0; LANDMARK_VALUES]).is_some());
    }

    #[test]
    fn test_eye_centers_use_first_four_points() {
        let lm = LandmarkSet::from_flat(flat_landmarks()).unwrap();
        let left = lm.left_eye_center();
        let right = lm.right_eye_center();
        assert_eq!((left.x, left.y), (0.3125, 0.375));
        assert_eq!((right.x, right.y), (0.6875, 0.375));
        assert_eq!(lm.points().count(), LANDMARK_POINTS);
    }

    #[test]
    fn test_emotion_order_and_labels() {
        let labels: Vec<_> = Emotion::ALL.iter().map(|e| e.label()).collect();
        assert_eq!(labels, ["neutral", "happy", "sad", "surprise", "anger"]);
    }

    #[test]
    fn test_default_age_gender() {
        let d = AgeGender::default();
        assert_eq!(d.age, 0);
        assert_eq!(d.gender, Gender::Female);
    }
}
