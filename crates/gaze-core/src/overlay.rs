//! Frame-space geometry for annotating pipeline results.
//!
//! Everything here is pure: it turns a [`FaceResult`] into line segments,
//! points and label positions in frame pixels. Rasterizing them is left to
//! the caller.

use crate::geometry::{FrameSpace, PixelPoint};
use crate::types::{FaceBox, FaceResult, GazeVector, HeadPose};

pub const DEFAULT_AXIS_LENGTH: f32 = 50.0;
pub const DEFAULT_ARROW_LENGTH: f32 = 100.0;
const LABEL_LINE_HEIGHT: i32 = 20;
const LABEL_MARGIN: i32 = 10;
/// Labels whose baseline would land above this row are moved inside the box.
const LABEL_MIN_Y: i32 = 20;

/// A line segment in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: PixelPoint<FrameSpace>,
    pub end: PixelPoint<FrameSpace>,
}

/// Projected head-pose axes, all starting at the face box center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseAxes {
    /// Points right for a frontal face.
    pub x: Segment,
    /// Points down for a frontal face.
    pub y: Segment,
    /// Points toward the camera; collapses to the center for a frontal face.
    pub z: Segment,
}

/// Project yaw/pitch/roll (degrees) onto the image plane.
pub fn head_pose_axes(face_box: &FaceBox, pose: HeadPose, length: f32) -> PoseAxes {
    let (cx, cy) = face_box.center();
    let origin = PixelPoint::new(cx, cy);
    let (sy, cy_) = pose.yaw.to_radians().sin_cos();
    let (sp, cp) = pose.pitch.to_radians().sin_cos();
    let (sr, cr) = pose.roll.to_radians().sin_cos();

    let axis = |dx: f32, dy: f32| Segment {
        start: origin,
        end: offset(origin, dx * length, dy * length),
    };

    PoseAxes {
        x: axis(cy_ * cr, cp * sr + cr * sp * sy),
        y: axis(-cy_ * sr, cp * cr - sp * sy * sr),
        z: axis(sy, -cy_ * sp),
    }
}

/// One arrow per eye, starting at the eye center, along the gaze's x/y.
///
/// `None` when the face has no gaze estimate.
pub fn gaze_arrows(face: &FaceResult, length: f32) -> Option<[Segment; 2]> {
    let gaze = face.gaze?;
    let arrow = |start: PixelPoint<FrameSpace>| Segment {
        start,
        end: gaze_endpoint(start, gaze, length),
    };
    Some([
        arrow(face.eyes.left.to_frame(&face.face_box)),
        arrow(face.eyes.right.to_frame(&face.face_box)),
    ])
}

pub fn gaze_endpoint(start: PixelPoint<FrameSpace>, gaze: GazeVector, length: f32) -> PixelPoint<FrameSpace> {
    offset(start, gaze.x * length, gaze.y * length)
}

/// All landmarks mapped into frame pixels.
pub fn landmark_points(face: &FaceResult) -> Vec<PixelPoint<FrameSpace>> {
    face.landmarks
        .points()
        .map(|p| p.to_frame(&face.face_box))
        .collect()
}

/// Text lines shown next to a face, top line first.
pub fn label_lines(face: &FaceResult) -> Vec<String> {
    vec![
        format!("{}, {}", face.age_gender.gender, face.age_gender.age),
        face.emotion.to_string(),
    ]
}

/// Baseline-left anchor of label line `line`.
///
/// Lines stack upward from just above the box; if that would put them too
/// close to the top edge they stack downward inside the box instead.
pub fn label_origin(face_box: &FaceBox, line: usize) -> PixelPoint<FrameSpace> {
    let step = LABEL_LINE_HEIGHT * line as i32;
    let above = face_box.y_min - LABEL_MARGIN - step;
    let y = if above < LABEL_MIN_Y {
        face_box.y_min + LABEL_LINE_HEIGHT + step
    } else {
        above
    };
    PixelPoint::new(face_box.x_min, y)
}

fn offset(p: PixelPoint<FrameSpace>, dx: f32, dy: f32) -> PixelPoint<FrameSpace> {
    PixelPoint::new((p.x as f32 + dx) as i32, (p.y as f32 + dy) as i32)
}
