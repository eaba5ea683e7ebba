//! Gaze regressor: two eye crops plus head pose in, one 3D direction out.

use crate::models::{first_output, ModelError};
use crate::preprocess::{preprocess, ChannelOrder};
use crate::provider::InferenceSession;
use crate::types::{GazeVector, HeadPose};
use image::RgbImage;
use ndarray::Array2;

const EYE_INPUT_SIZE: usize = 60;
pub const LEFT_EYE_INPUT: &str = "left_eye_image";
pub const RIGHT_EYE_INPUT: &str = "right_eye_image";
pub const HEAD_POSE_INPUT: &str = "head_pose_angles";

pub struct GazeEstimator {
    session: Box<dyn InferenceSession>,
}

impl GazeEstimator {
    /// Wrap a loaded session after checking it declares all three inputs.
    pub fn new(session: Box<dyn InferenceSession>) -> Result<Self, ModelError> {
        let declared = session.input_names();
        let missing: Vec<&str> = [LEFT_EYE_INPUT, RIGHT_EYE_INPUT, HEAD_POSE_INPUT]
            .into_iter()
            .filter(|name| !declared.iter().any(|d| d == name))
            .collect();
        if !missing.is_empty() {
            return Err(ModelError::Contract(format!(
                "gaze model is missing inputs {missing:?} (declares {declared:?})"
            )));
        }
        Ok(Self { session })
    }

    /// Both eye images must be non-empty; the orchestrator checks this.
    pub fn estimate(
        &mut self,
        left_eye: &RgbImage,
        right_eye: &RgbImage,
        head_pose: HeadPose,
    ) -> Result<GazeVector, ModelError> {
        let left = preprocess(left_eye, EYE_INPUT_SIZE, EYE_INPUT_SIZE, ChannelOrder::Bgr)?;
        let right = preprocess(right_eye, EYE_INPUT_SIZE, EYE_INPUT_SIZE, ChannelOrder::Bgr)?;
        let angles = Array2::from_shape_vec((1, 3), vec![head_pose.yaw, head_pose.pitch, head_pose.roll])
            .map_err(|e| ModelError::Contract(format!("head pose tensor: {e}")))?;

        let outputs = self.session.infer(&[
            (LEFT_EYE_INPUT, left.view().into_dyn()),
            (RIGHT_EYE_INPUT, right.view().into_dyn()),
            (HEAD_POSE_INPUT, angles.view().into_dyn()),
        ])?;

        let values = first_output(&outputs)?;
        match values.as_slice() {
            [x, y, z, ..] => Ok(GazeVector { x: *x, y: *y, z: *z }),
            _ => Err(ModelError::UnexpectedOutput(format!(
                "expected 3 gaze values, got {}",
                values.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{tensor, StubSession};
    use image::Rgb;

    const INPUTS: [&str; 3] = [LEFT_EYE_INPUT, RIGHT_EYE_INPUT, HEAD_POSE_INPUT];

    #[test]
    fn test_missing_inputs_rejected() {
        let stub = StubSession::boxed(&["left_eye_image", "data"], vec![]);
        assert!(matches!(GazeEstimator::new(stub), Err(ModelError::Contract(_))));
    }

    #[test]
    fn test_estimate_packs_named_inputs() {
        let stub = StubSession::new(
            &INPUTS,
            vec![tensor("gaze_vector", &[1, 3], vec![0.25, -0.5, 0.75])],
        );
        let seen = stub.seen.clone();
        let mut estimator = GazeEstimator::new(Box::new(stub)).unwrap();

        let eye = RgbImage::from_pixel(32, 32, Rgb([100, 100, 100]));
        let pose = HeadPose { yaw: 10.0, pitch: -5.0, roll: 1.0 };
        let gaze = estimator.estimate(&eye, &eye, pose).unwrap();

        assert_eq!(gaze, GazeVector { x: 0.25, y: -0.5, z: 0.75 });
        let calls = seen.lock().unwrap();
        assert_eq!(
            calls[0],
            vec![
                (LEFT_EYE_INPUT.to_string(), vec![1, 3, 60, 60]),
                (RIGHT_EYE_INPUT.to_string(), vec![1, 3, 60, 60]),
                (HEAD_POSE_INPUT.to_string(), vec![1, 3]),
            ]
        );
    }

    #[test]
    fn test_short_output_rejected() {
        let stub = StubSession::boxed(&INPUTS, vec![tensor("gaze_vector", &[1, 2], vec![0.1, 0.2])]);
        let mut estimator = GazeEstimator::new(stub).unwrap();
        let eye = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        assert!(matches!(
            estimator.estimate(&eye, &eye, HeadPose::default()),
            Err(ModelError::UnexpectedOutput(_))
        ));
    }
}
