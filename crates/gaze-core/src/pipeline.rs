//! Per-frame orchestration of the six adapters.
//!
//! For every detected face:
//! `Detect → Crop → {Landmarks, HeadPose, AgeGender, Emotion} → eye centers → eye crops → [Gaze]`.
//! Nothing survives between calls to [`GazePipeline::run`] except the loaded
//! sessions.

use crate::age_gender::AgeGenderClassifier;
use crate::detector::{FaceDetector, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::emotion::EmotionClassifier;
use crate::eyes::{crop_eye, DEFAULT_EYE_SCALE};
use crate::gaze::GazeEstimator;
use crate::head_pose::HeadPoseEstimator;
use crate::landmarks::LandmarkRegressor;
use crate::models::{ModelCatalog, ModelError, ModelKind};
use crate::provider::{Device, InferenceProvider, InferenceSession};
use crate::types::{
    AgeGender, Emotion, EyeCenters, FaceBox, FaceResult, FrameResult, HeadPose, LandmarkSet,
};
use image::{imageops, RgbImage};
use std::fmt;
use std::thread;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to load {model} model: {source}")]
    Load {
        model: ModelKind,
        #[source]
        source: ModelError,
    },
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ModelError,
    },
    #[error("{0} worker panicked")]
    WorkerPanicked(Stage),
}

/// Pipeline stage, for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detect,
    Landmarks,
    HeadPose,
    AgeGender,
    Emotion,
    Gaze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Detect => "detect",
            Stage::Landmarks => "landmarks",
            Stage::HeadPose => "head pose",
            Stage::AgeGender => "age/gender",
            Stage::Emotion => "emotion",
            Stage::Gaze => "gaze",
        })
    }
}

trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageContext<T> for Result<T, ModelError> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError::Stage { stage, source })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detections at or below this confidence are dropped.
    pub confidence_threshold: f32,
    /// Run the four per-face models on scoped worker threads.
    pub parallel_face_models: bool,
    /// Passed through to [`crop_eye`]; currently has no effect on crop size.
    pub eye_scale: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            parallel_face_models: false,
            eye_scale: DEFAULT_EYE_SCALE,
        }
    }
}

/// One loaded session per model.
pub struct ModelSessions {
    pub face_detection: Box<dyn InferenceSession>,
    pub landmarks: Box<dyn InferenceSession>,
    pub head_pose: Box<dyn InferenceSession>,
    pub gaze: Box<dyn InferenceSession>,
    pub age_gender: Box<dyn InferenceSession>,
    pub emotion: Box<dyn InferenceSession>,
}

impl ModelSessions {
    /// Load all six models up front. Any failure is fatal.
    pub fn load(
        provider: &dyn InferenceProvider,
        catalog: &ModelCatalog,
        device: Device,
    ) -> Result<Self, PipelineError> {
        let load = |kind: ModelKind| {
            let path = catalog.path(kind);
            tracing::info!(model = %kind, path = %path.display(), %device, "loading model");
            provider
                .load(&path, device)
                .map_err(|e| PipelineError::Load {
                    model: kind,
                    source: e.into(),
                })
        };

        Ok(Self {
            face_detection: load(ModelKind::FaceDetection)?,
            landmarks: load(ModelKind::Landmarks)?,
            head_pose: load(ModelKind::HeadPose)?,
            gaze: load(ModelKind::Gaze)?,
            age_gender: load(ModelKind::AgeGender)?,
            emotion: load(ModelKind::Emotion)?,
        })
    }
}

/// Per-face model outputs that do not depend on each other.
struct FaceAttributes {
    landmarks: LandmarkSet,
    head_pose: HeadPose,
    age_gender: AgeGender,
    emotion: Emotion,
}

pub struct GazePipeline {
    detector: FaceDetector,
    landmarks: LandmarkRegressor,
    head_pose: HeadPoseEstimator,
    age_gender: AgeGenderClassifier,
    emotion: EmotionClassifier,
    gaze: GazeEstimator,
    config: PipelineConfig,
}

impl GazePipeline {
    /// Load every model through `provider` and assemble the pipeline.
    pub fn load(
        provider: &dyn InferenceProvider,
        catalog: &ModelCatalog,
        device: Device,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let sessions = ModelSessions::load(provider, catalog, device)?;
        Self::from_sessions(sessions, config)
    }

    /// Assemble the pipeline from already-loaded sessions, validating each
    /// model's input/output contract.
    pub fn from_sessions(sessions: ModelSessions, config: PipelineConfig) -> Result<Self, PipelineError> {
        let contract = |model: ModelKind| move |source: ModelError| PipelineError::Load { model, source };

        Ok(Self {
            detector: FaceDetector::new(sessions.face_detection),
            landmarks: LandmarkRegressor::new(sessions.landmarks),
            head_pose: HeadPoseEstimator::new(sessions.head_pose).map_err(contract(ModelKind::HeadPose))?,
            age_gender: AgeGenderClassifier::new(sessions.age_gender),
            emotion: EmotionClassifier::new(sessions.emotion),
            gaze: GazeEstimator::new(sessions.gaze).map_err(contract(ModelKind::Gaze))?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on one frame.
    pub fn run(&mut self, frame: &RgbImage) -> Result<FrameResult, PipelineError> {
        let boxes = self
            .detector
            .detect(frame, self.config.confidence_threshold)
            .stage(Stage::Detect)?;

        let mut faces = Vec::with_capacity(boxes.len());
        for face_box in boxes {
            if face_box.is_empty() {
                tracing::debug!(?face_box, "skipping zero-area face");
                continue;
            }
            faces.push(self.process_face(frame, face_box)?);
        }

        Ok(FrameResult { faces })
    }

    fn process_face(&mut self, frame: &RgbImage, face_box: FaceBox) -> Result<FaceResult, PipelineError> {
        let face = imageops::crop_imm(
            frame,
            face_box.x_min as u32,
            face_box.y_min as u32,
            face_box.width(),
            face_box.height(),
        )
        .to_image();

        let attrs = if self.config.parallel_face_models {
            self.analyze_face_parallel(&face)?
        } else {
            self.analyze_face(&face)?
        };

        let left = crop_eye(&face, attrs.landmarks.left_eye_center(), self.config.eye_scale);
        let right = crop_eye(&face, attrs.landmarks.right_eye_center(), self.config.eye_scale);

        let gaze = if left.is_empty() || right.is_empty() {
            tracing::debug!(
                ?face_box,
                left = ?left.image.dimensions(),
                right = ?right.image.dimensions(),
                "degenerate eye crop, skipping gaze"
            );
            None
        } else {
            Some(
                self.gaze
                    .estimate(&left.image, &right.image, attrs.head_pose)
                    .stage(Stage::Gaze)?,
            )
        };

        tracing::debug!(
            ?face_box,
            yaw = attrs.head_pose.yaw,
            pitch = attrs.head_pose.pitch,
            roll = attrs.head_pose.roll,
            age = attrs.age_gender.age,
            gender = %attrs.age_gender.gender,
            emotion = %attrs.emotion,
            ?gaze,
            "face processed"
        );

        Ok(FaceResult {
            face_box,
            landmarks: attrs.landmarks,
            head_pose: attrs.head_pose,
            gaze,
            eyes: EyeCenters {
                left: left.center,
                right: right.center,
            },
            age_gender: attrs.age_gender,
            emotion: attrs.emotion,
        })
    }

    fn analyze_face(&mut self, face: &RgbImage) -> Result<FaceAttributes, PipelineError> {
        Ok(FaceAttributes {
            landmarks: self.landmarks.estimate(face).stage(Stage::Landmarks)?,
            head_pose: self.head_pose.estimate(face).stage(Stage::HeadPose)?,
            age_gender: self.age_gender.classify(face).stage(Stage::AgeGender)?,
            emotion: self.emotion.classify(face).stage(Stage::Emotion)?,
        })
    }

    /// Same as [`analyze_face`](Self::analyze_face), one scoped thread per
    /// model. Each adapter owns its session, so no session is shared.
    fn analyze_face_parallel(&mut self, face: &RgbImage) -> Result<FaceAttributes, PipelineError> {
        let Self {
            landmarks,
            head_pose,
            age_gender,
            emotion,
            ..
        } = self;

        thread::scope(|s| {
            let lm = s.spawn(move || landmarks.estimate(face));
            let hp = s.spawn(move || head_pose.estimate(face));
            let ag = s.spawn(move || age_gender.classify(face));
            let em = emotion.classify(face).stage(Stage::Emotion);

            // Join every worker before propagating so none is left running.
            let landmarks = join_worker(Stage::Landmarks, lm);
            let head_pose = join_worker(Stage::HeadPose, hp);
            let age_gender = join_worker(Stage::AgeGender, ag);

            Ok(FaceAttributes {
                landmarks: landmarks?,
                head_pose: head_pose?,
                age_gender: age_gender?,
                emotion: em?,
            })
        })
    }
}

fn join_worker<T>(
    stage: Stage,
    handle: thread::ScopedJoinHandle<'_, Result<T, ModelError>>,
) -> Result<T, PipelineError> {
    handle
        .join()
        .map_err(|_| PipelineError::WorkerPanicked(stage))?
        .stage(stage)
}
