//! gaze-core: Multi-stage gaze estimation pipeline.
//!
//! Detects faces, runs landmark, head-pose, age/gender and emotion models on
//! each face crop, cuts out both eyes and regresses a 3D gaze vector. All
//! models run via ONNX Runtime behind the [`InferenceProvider`] seam.

pub mod age_gender;
pub mod detector;
pub mod emotion;
pub mod eyes;
pub mod gaze;
pub mod geometry;
pub mod head_pose;
pub mod landmarks;
pub mod models;
pub mod overlay;
pub mod pipeline;
pub mod preprocess;
pub mod provider;
pub mod types;

pub use detector::DEFAULT_CONFIDENCE_THRESHOLD;
pub use geometry::{FaceSpace, FrameSpace, NormalizedPoint, PixelPoint};
pub use models::{default_model_dir, ModelCatalog, ModelEntry, ModelError, ModelKind};
pub use pipeline::{GazePipeline, ModelSessions, PipelineConfig, PipelineError, Stage};
pub use provider::{Device, InferenceProvider, InferenceSession, OrtProvider, ProviderError};
pub use types::{
    AgeGender, Emotion, EyeCenters, FaceBox, FaceResult, FrameResult, GazeVector, Gender, HeadPose,
    LandmarkSet,
};
