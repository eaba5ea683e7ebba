//! Coordinate spaces used by the pipeline.
//!
//! Points carry the space they live in as a type parameter, so a face-local
//! pixel cannot be handed to code expecting a frame pixel without an explicit
//! conversion through the owning [`FaceBox`].

use crate::types::FaceBox;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Full source frame, origin at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpace;

/// Cropped face image, origin at the face box's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceSpace;

/// Integer pixel coordinate in space `S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PixelPoint<S> {
    pub x: i32,
    pub y: i32,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S> PixelPoint<S> {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }
}

impl PixelPoint<FaceSpace> {
    /// Translate a face-local pixel into the frame the face was cropped from.
    pub fn to_frame(self, face: &FaceBox) -> PixelPoint<FrameSpace> {
        PixelPoint::new(face.x_min.saturating_add(self.x), face.y_min.saturating_add(self.y))
    }
}

/// Fractional coordinate relative to the width/height of space `S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct NormalizedPoint<S> {
    pub x: f32,
    pub y: f32,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S> NormalizedPoint<S> {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    pub fn midpoint(a: Self, b: Self) -> Self {
        Self::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }
}

impl NormalizedPoint<FaceSpace> {
    /// Scale into face-local pixels, truncating toward zero.
    pub fn to_pixels(self, face_width: u32, face_height: u32) -> PixelPoint<FaceSpace> {
        PixelPoint::new(
            (self.x * face_width as f32) as i32,
            (self.y * face_height as f32) as i32,
        )
    }

    /// Map straight into frame pixels: `normalized * box_size + box_origin`.
    pub fn to_frame(self, face: &FaceBox) -> PixelPoint<FrameSpace> {
        PixelPoint::new(
            (self.x * face.width() as f32 + face.x_min as f32) as i32,
            (self.y * face.height() as f32 + face.y_min as f32) as i32,
        )
    }
}
