//! Synthetic camera and landmark model
//!
//! Deterministic stand-ins for the platform camera and the face tracker.
//! The camera repaints every frame twice so the capture loop sees stale
//! frames the way it does with a real video element.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use vroom_capture::{
    CameraConstraints, CameraProvider, CameraStream, FaceDetection, LandmarkModel, ModelLoader,
    ModelOptions, VideoFrame,
};
use vroom_core::{BlendshapeSample, Timestamp, VroomError, VroomResult};

/// Media-time step between distinct frames
pub const SYNTHETIC_FRAME_STEP: Duration = Duration::from_millis(33);

#[derive(Debug, Default)]
struct CameraShared {
    opened: AtomicU64,
    live: AtomicBool,
}

/// Camera producing blank frames with advancing media time
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    denied: bool,
    shared: Arc<CameraShared>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        SyntheticCamera {
            denied: false,
            shared: Arc::default(),
        }
    }

    /// A camera whose permission prompt is always refused
    pub fn denied() -> Self {
        SyntheticCamera {
            denied: true,
            shared: Arc::default(),
        }
    }

    /// How many streams were opened
    pub fn open_count(&self) -> u64 {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Whether the most recent stream is still running
    pub fn is_live(&self) -> bool {
        self.shared.live.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraProvider for SyntheticCamera {
    fn open(&self, constraints: &CameraConstraints) -> VroomResult<Box<dyn CameraStream>> {
        if self.denied {
            return Err(VroomError::Capability("camera permission denied".into()));
        }
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared.live.store(true, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            width: constraints.width,
            height: constraints.height,
            reads: 0,
            shared: self.shared.clone(),
        }))
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    reads: u64,
    shared: Arc<CameraShared>,
}

impl CameraStream for SyntheticStream {
    fn current_frame(&mut self) -> VroomResult<Option<VideoFrame>> {
        if !self.is_live() {
            return Err(VroomError::Stream("stream stopped".into()));
        }
        self.reads += 1;
        // Each frame is painted twice
        let index = (self.reads + 1) / 2;
        let media_time = SYNTHETIC_FRAME_STEP * index as u32;
        Ok(Some(VideoFrame::new(self.width, self.height, media_time, Bytes::new())))
    }

    fn stop(&mut self) {
        self.shared.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.shared.live.load(Ordering::SeqCst)
    }
}

/// Blendshapes driven by media time
#[derive(Debug, Clone, Default)]
pub struct SyntheticModel {
    /// Report no face on every n-th frame
    pub miss_every: Option<u64>,
}

impl SyntheticModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing_every(n: u64) -> Self {
        SyntheticModel {
            miss_every: Some(n.max(1)),
        }
    }

    /// Expected face for a frame at `media_time`
    pub fn face_at(media_time: Duration) -> FaceDetection {
        let t = media_time.as_secs_f32();
        let wave = |hz: f32, phase: f32| 0.5 + 0.5 * (t * hz * std::f32::consts::TAU + phase).sin();

        let yaw = 0.3 * (t * 0.5 * std::f32::consts::TAU).sin();
        let (s, c) = yaw.sin_cos();

        FaceDetection {
            blendshapes: vec![
                BlendshapeSample::new("jawOpen", wave(1.0, 0.0)),
                BlendshapeSample::new("eyeBlinkLeft", wave(0.25, 1.0)),
                BlendshapeSample::new("eyeBlinkRight", wave(0.25, 1.0)),
                BlendshapeSample::new("mouthSmileLeft", wave(0.1, 2.0)),
                BlendshapeSample::new("mouthSmileRight", wave(0.1, 2.0)),
            ],
            // Rotation about Y, column-major
            transform: Some([
                c, 0.0, -s, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                s, 0.0, c, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ]),
        }
    }
}

impl LandmarkModel for SyntheticModel {
    fn detect(&self, frame: &VideoFrame, _now: Timestamp) -> VroomResult<Option<FaceDetection>> {
        let index = frame.media_time.as_millis() as u64 / SYNTHETIC_FRAME_STEP.as_millis() as u64;
        if let Some(n) = self.miss_every {
            if index % n == 0 {
                return Ok(None);
            }
        }
        Ok(Some(Self::face_at(frame.media_time)))
    }
}

/// Loader handing out [`SyntheticModel`]s
#[derive(Debug, Clone, Default)]
pub struct SyntheticLoader {
    pub fail: bool,
    pub model: SyntheticModel,
}

impl SyntheticLoader {
    pub fn failing() -> Self {
        SyntheticLoader {
            fail: true,
            ..Self::default()
        }
    }
}

impl ModelLoader for SyntheticLoader {
    fn load(&self, options: &ModelOptions) -> VroomResult<Box<dyn LandmarkModel>> {
        if self.fail {
            return Err(VroomError::Initialization(format!(
                "could not fetch {}",
                options.model_asset_path
            )));
        }
        Ok(Box::new(self.model.clone()))
    }
}
