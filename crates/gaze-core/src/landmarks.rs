//! 35-point facial landmark regressor.

use crate::models::{first_output, infer_single, ModelError};
use crate::preprocess::{preprocess, ChannelOrder};
use crate::provider::InferenceSession;
use crate::types::{LandmarkSet, LANDMARK_VALUES};
use image::RgbImage;

const LANDMARKS_INPUT_SIZE: usize = 60;

pub struct LandmarkRegressor {
    session: Box<dyn InferenceSession>,
}

impl LandmarkRegressor {
    pub fn new(session: Box<dyn InferenceSession>) -> Self {
        Self { session }
    }

    /// Landmarks normalized to `face`'s own width and height.
    pub fn estimate(&mut self, face: &RgbImage) -> Result<LandmarkSet, ModelError> {
        let input = preprocess(face, LANDMARKS_INPUT_SIZE, LANDMARKS_INPUT_SIZE, ChannelOrder::Bgr)?;
        let outputs = infer_single(self.session.as_mut(), &input)?;
        decode_landmarks(first_output(&outputs)?)
    }
}

fn decode_landmarks(values: Vec<f32>) -> Result<LandmarkSet, ModelError> {
    let len = values.len();
    LandmarkSet::from_flat(values).ok_or_else(|| {
        ModelError::UnexpectedOutput(format!(
            "expected {LANDMARK_VALUES} landmark values, got {len}"
        ))
    })
}
