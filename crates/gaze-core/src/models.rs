//! Model catalog and the pieces shared by every adapter.

use crate::preprocess::PreprocessError;
use crate::provider::{InferenceSession, NamedTensor, ProviderError};
use ndarray::Array4;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("model contract violated: {0}")]
    Contract(String),
    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),
}

/// The six networks the pipeline chains together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    FaceDetection,
    Landmarks,
    HeadPose,
    Gaze,
    AgeGender,
    Emotion,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::FaceDetection,
        ModelKind::Landmarks,
        ModelKind::HeadPose,
        ModelKind::Gaze,
        ModelKind::AgeGender,
        ModelKind::Emotion,
    ];

    /// Default model identifier; the file is `<identifier>.onnx`.
    pub fn identifier(&self) -> &'static str {
        match self {
            ModelKind::FaceDetection => "face-detection-adas-0001",
            ModelKind::Landmarks => "facial-landmarks-35-adas-0002",
            ModelKind::HeadPose => "head-pose-estimation-adas-0001",
            ModelKind::Gaze => "gaze-estimation-adas-0002",
            ModelKind::AgeGender => "age-gender-recognition-retail-0013",
            ModelKind::Emotion => "emotions-recognition-retail-0003",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelKind::FaceDetection => "Face Detection (MobileNet + SSD)",
            ModelKind::Landmarks => "Facial Landmarks (Regression CNN, 35 points)",
            ModelKind::HeadPose => "Head Pose Estimation (Yaw, Pitch, Roll)",
            ModelKind::Gaze => "Gaze Estimation (Multi-stream CNN)",
            ModelKind::AgeGender => "Age & Gender Recognition (Multi-task CNN)",
            ModelKind::Emotion => "Emotion Recognition (Classification)",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::FaceDetection => "face_detection",
            ModelKind::Landmarks => "landmarks",
            ModelKind::HeadPose => "head_pose",
            ModelKind::Gaze => "gaze",
            ModelKind::AgeGender => "age_gender",
            ModelKind::Emotion => "emotion",
        })
    }
}

/// Default location of the model files.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

/// Where each model lives on disk.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    model_dir: PathBuf,
}

/// One row of [`ModelCatalog::inventory`].
#[derive(Debug, Clone)]
pub struct ModelEntry {
    pub kind: ModelKind,
    pub path: PathBuf,
    pub present: bool,
}

impl ModelCatalog {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn path(&self, kind: ModelKind) -> PathBuf {
        self.model_dir.join(format!("{}.onnx", kind.identifier()))
    }

    /// Report which model files exist.
    pub fn inventory(&self) -> Vec<ModelEntry> {
        ModelKind::ALL
            .iter()
            .map(|&kind| {
                let path = self.path(kind);
                let present = path.is_file();
                ModelEntry {
                    kind,
                    path,
                    present,
                }
            })
            .collect()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(default_model_dir())
    }
}

/// Run a model that takes a single image tensor on its first input.
pub(crate) fn infer_single(
    session: &mut dyn InferenceSession,
    input: &Array4<f32>,
) -> Result<Vec<NamedTensor>, ModelError> {
    let name = session
        .input_names()
        .first()
        .cloned()
        .ok_or_else(|| ModelError::Contract("model declares no inputs".into()))?;
    let outputs = session.infer(&[(name.as_str(), input.view().into_dyn())])?;
    Ok(outputs)
}

/// First output tensor, flattened.
pub(crate) fn first_output(outputs: &[NamedTensor]) -> Result<Vec<f32>, ModelError> {
    outputs
        .first()
        .map(NamedTensor::to_flat)
        .ok_or_else(|| ModelError::UnexpectedOutput("model produced no outputs".into()))
}
