//! Facial landmark model handle
//!
//! One model instance is created per session and injected into the capture
//! loop. Clones of `TrackingModel` share the instance; dropping the last
//! clone releases it.

use std::fmt;
use std::sync::Arc;

use vroom_core::{BlendshapeSample, Timestamp, VroomError, VroomResult};

use crate::VideoFrame;

pub const DEFAULT_MODEL_ASSET: &str = "https://storage.googleapis.com/mediapipe-models/face_landmarker/face_landmarker/float16/1/face_landmarker.task";

/// Inference backend preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delegate {
    #[default]
    Gpu,
    Cpu,
}

/// How the model is fed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunningMode {
    Image,
    #[default]
    Video,
}

/// Model load options
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub model_asset_path: String,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
    pub num_faces: u8,
    pub output_blendshapes: bool,
    pub output_transformation_matrix: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            model_asset_path: DEFAULT_MODEL_ASSET.to_string(),
            delegate: Delegate::Gpu,
            running_mode: RunningMode::Video,
            num_faces: 1,
            output_blendshapes: true,
            output_transformation_matrix: true,
        }
    }
}

/// Raw model output for the first detected face
#[derive(Debug, Clone, Default)]
pub struct FaceDetection {
    pub blendshapes: Vec<BlendshapeSample>,
    /// 4x4 column-major facial transformation matrix
    pub transform: Option<[f32; 16]>,
}

/// A loaded landmark model
pub trait LandmarkModel: Send + Sync {
    /// Run detection on one frame. `Ok(None)` means no face.
    fn detect(&self, frame: &VideoFrame, now: Timestamp) -> VroomResult<Option<FaceDetection>>;
}

/// Loads landmark models (fetching assets, compiling kernels...)
pub trait ModelLoader {
    fn load(&self, options: &ModelOptions) -> VroomResult<Box<dyn LandmarkModel>>;
}

/// Shared handle to the session's landmark model
#[derive(Clone)]
pub struct TrackingModel {
    inner: Arc<dyn LandmarkModel>,
    options: ModelOptions,
}

impl TrackingModel {
    /// Load a model. Any loader failure surfaces as `Initialization`.
    pub fn load(loader: &dyn ModelLoader, options: ModelOptions) -> VroomResult<Self> {
        let model = loader.load(&options).map_err(|e| match e {
            VroomError::Initialization(msg) => VroomError::Initialization(msg),
            other => VroomError::Initialization(other.to_string()),
        })?;

        tracing::info!(
            asset = %options.model_asset_path,
            delegate = ?options.delegate,
            "Tracking model loaded"
        );

        Ok(TrackingModel {
            inner: Arc::from(model),
            options,
        })
    }

    /// Wrap an already-loaded model
    pub fn from_model(model: Arc<dyn LandmarkModel>, options: ModelOptions) -> Self {
        TrackingModel {
            inner: model,
            options,
        }
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn detect(&self, frame: &VideoFrame, now: Timestamp) -> VroomResult<Option<FaceDetection>> {
        self.inner.detect(frame, now)
    }
}

impl fmt::Debug for TrackingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingModel")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
