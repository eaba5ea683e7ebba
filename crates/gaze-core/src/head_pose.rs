//! Head pose regressor: three scalar outputs for yaw, pitch and roll.

use crate::models::{infer_single, ModelError};
use crate::preprocess::{preprocess, ChannelOrder};
use crate::provider::{InferenceSession, NamedTensor};
use crate::types::HeadPose;
use image::RgbImage;

const HEAD_POSE_INPUT_SIZE: usize = 60;
const YAW_OUTPUT: &str = "angle_y_fc";
const PITCH_OUTPUT: &str = "angle_p_fc";
const ROLL_OUTPUT: &str = "angle_r_fc";

/// Output indices for (yaw, pitch, roll).
type AngleOutputIndices = (usize, usize, usize);

pub struct HeadPoseEstimator {
    session: Box<dyn InferenceSession>,
    angle_indices: AngleOutputIndices,
}

impl HeadPoseEstimator {
    /// Wrap a loaded session, resolving which output carries which angle.
    pub fn new(session: Box<dyn InferenceSession>) -> Result<Self, ModelError> {
        let names = session.output_names();
        if names.len() < 3 {
            return Err(ModelError::Contract(format!(
                "head pose model needs 3 outputs (yaw, pitch, roll), got {}",
                names.len()
            )));
        }
        let angle_indices = discover_angle_indices(names);
        tracing::debug!(?angle_indices, "head pose output mapping");
        Ok(Self {
            session,
            angle_indices,
        })
    }

    pub fn estimate(&mut self, face: &RgbImage) -> Result<HeadPose, ModelError> {
        let input = preprocess(face, HEAD_POSE_INPUT_SIZE, HEAD_POSE_INPUT_SIZE, ChannelOrder::Bgr)?;
        let outputs = infer_single(self.session.as_mut(), &input)?;
        let (yaw, pitch, roll) = self.angle_indices;
        Ok(HeadPose {
            yaw: scalar(&outputs, yaw)?,
            pitch: scalar(&outputs, pitch)?,
            roll: scalar(&outputs, roll)?,
        })
    }
}

/// Map yaw/pitch/roll to output slots by name, falling back to declaration
/// order when the names are not recognized.
fn discover_angle_indices(names: &[String]) -> AngleOutputIndices {
    let find = |target: &str| names.iter().position(|n| n == target);
    match (find(YAW_OUTPUT), find(PITCH_OUTPUT), find(ROLL_OUTPUT)) {
        (Some(y), Some(p), Some(r)) => (y, p, r),
        _ => {
            tracing::warn!(
                ?names,
                "head pose: output names not recognized, using positional mapping [0]=yaw, [1]=pitch, [2]=roll"
            );
            (0, 1, 2)
        }
    }
}

fn scalar(outputs: &[NamedTensor], index: usize) -> Result<f32, ModelError> {
    outputs
        .get(index)
        .and_then(|t| t.value.iter().next().copied())
        .ok_or_else(|| ModelError::UnexpectedOutput(format!("head pose output {index} missing or empty")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{tensor, StubSession};
    use image::Rgb;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_discover_named() {
        let idx = discover_angle_indices(&names(&["angle_r_fc", "angle_p_fc", "angle_y_fc"]));
        assert_eq!(idx, (2, 1, 0));
    }

    #[test]
    fn test_discover_positional_fallback() {
        let idx = discover_angle_indices(&names(&["a", "b", "c"]));
        assert_eq!(idx, (0, 1, 2));
    }

    #[test]
    fn test_requires_three_outputs() {
        let stub = StubSession::boxed(&["data"], vec![tensor("angle_y_fc", &[1, 1], vec![1.0])]);
        assert!(matches!(HeadPoseEstimator::new(stub), Err(ModelError::Contract(_))));
    }

    #[test]
    fn test_estimate_reads_named_outputs() {
        let stub = StubSession::boxed(
            &["data"],
            vec![
                tensor("angle_p_fc", &[1, 1], vec![-4.5]),
                tensor("angle_r_fc", &[1, 1], vec![2.0]),
                tensor("angle_y_fc", &[1, 1], vec![12.25]),
            ],
        );
        let mut estimator = HeadPoseEstimator::new(stub).unwrap();
        let pose = estimator
            .estimate(&RgbImage::from_pixel(40, 40, Rgb([1, 2, 3])))
            .unwrap();
        assert_eq!(
            pose,
            HeadPose {
                yaw: 12.25,
                pitch: -4.5,
                roll: 2.0
            }
        );
    }
}
