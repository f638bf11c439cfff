//! Capture loop - owns the camera stream and drives the frame processor

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use vroom_core::{Clock, TelemetryPayload, VroomResult};

use crate::{
    CameraConstraints, CameraProvider, CameraStream, CaptureStats, CapturedSample, FrameOutcome,
    FrameProcessor, TrackingModel,
};

/// Capture configuration
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Frame pull cadence (display refresh)
    pub frame_interval: Duration,
    /// Minimum spacing between emitted payloads
    pub emit_interval: Duration,
    pub constraints: CameraConstraints,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            frame_interval: Duration::from_millis(16),
            emit_interval: Duration::from_secs(1) / 30,
            constraints: CameraConstraints::default(),
        }
    }
}

struct Shared {
    camera: Mutex<Option<Box<dyn CameraStream>>>,
    processor: Mutex<FrameProcessor>,
    running: AtomicBool,
}

impl Shared {
    fn release_camera(&self) {
        if let Some(mut camera) = self.camera.lock().take() {
            camera.stop();
            tracing::info!("Camera stream released");
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Local face capture.
///
/// The camera stream is held for as long as the loop runs and is released
/// by `stop()`, by dropping the loop, or when the frame task ends on its own.
pub struct CaptureLoop {
    shared: Arc<Shared>,
    config: CaptureConfig,
    clock: Arc<dyn Clock>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureLoop {
    pub fn new(model: TrackingModel, config: CaptureConfig, clock: Arc<dyn Clock>) -> Self {
        let processor = FrameProcessor::new(model, config.emit_interval);
        CaptureLoop {
            shared: Arc::new(Shared {
                camera: Mutex::new(None),
                processor: Mutex::new(processor),
                running: AtomicBool::new(false),
            }),
            config,
            clock,
            task: Mutex::new(None),
        }
    }

    /// Open the camera and start the frame task.
    ///
    /// Returns `Ok(false)` if the loop is already running. Must be called
    /// from within a tokio runtime.
    pub fn start(
        &self,
        cameras: &dyn CameraProvider,
        sink: mpsc::Sender<CapturedSample>,
    ) -> VroomResult<bool> {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Capture already running, ignoring start");
            return Ok(false);
        }

        let camera = match cameras.open(&self.config.constraints) {
            Ok(camera) => camera,
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                tracing::warn!(error = %e, "Camera unavailable, continuing without local telemetry");
                return Err(e);
            }
        };
        *self.shared.camera.lock() = Some(camera);

        let handle = tokio::spawn(run_frames(
            Arc::clone(&self.shared),
            Arc::clone(&self.clock),
            self.config.frame_interval,
            sink,
        ));
        *self.task.lock() = Some(handle);

        tracing::info!(
            width = self.config.constraints.width,
            height = self.config.constraints.height,
            "Face capture started"
        );
        Ok(true)
    }

    /// Stop the camera and cancel the frame task. Idempotent.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.shared.release_camera();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Latest detected face state for local preview
    pub fn latest(&self) -> Option<TelemetryPayload> {
        self.shared.processor.lock().latest().cloned()
    }

    pub fn stats(&self) -> CaptureStats {
        self.shared.processor.lock().stats().clone()
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_frames(
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    frame_interval: Duration,
    sink: mpsc::Sender<CapturedSample>,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let frame = {
            let mut slot = shared.camera.lock();
            let Some(camera) = slot.as_mut() else {
                break;
            };
            if !camera.is_live() {
                tracing::warn!("Camera stream ended");
                break;
            }
            match camera.current_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Camera stream failed");
                    break;
                }
            }
        };

        let now = clock.now();
        let mut processor = shared.processor.lock();
        match processor.process(&frame, now) {
            FrameOutcome::Emit(payload) => match sink.try_send(CapturedSample::new(payload, now)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    processor.record_dropped();
                    tracing::debug!("Telemetry consumer lagging, sample dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!("Telemetry consumer gone, stopping capture");
                    break;
                }
            },
            FrameOutcome::Miss => tracing::trace!("No face in frame"),
            _ => {}
        }
    }

    shared.release_camera();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FaceDetection, LandmarkModel, ModelOptions, VideoFrame};
    use bytes::Bytes;
    use std::sync::atomic::AtomicU64;
    use vroom_core::{BlendshapeSample, ManualClock, Timestamp, VroomError};

    #[derive(Default)]
    struct CameraProbe {
        opened: AtomicU64,
        stopped: AtomicU64,
    }

    struct FakeCamera {
        probe: Arc<CameraProbe>,
        media_ms: u64,
        live: bool,
        fail_after: Option<u64>,
    }

    impl CameraStream for FakeCamera {
        fn current_frame(&mut self) -> VroomResult<Option<VideoFrame>> {
            self.media_ms += 16;
            if let Some(limit) = self.fail_after {
                if self.media_ms > limit {
                    return Err(VroomError::Stream("device unplugged".into()));
                }
            }
            Ok(Some(VideoFrame::new(
                1280,
                720,
                Duration::from_millis(self.media_ms),
                Bytes::new(),
            )))
        }

        fn stop(&mut self) {
            if self.live {
                self.live = false;
                self.probe.stopped.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_live(&self) -> bool {
            self.live
        }
    }

    struct FakeCameras {
        probe: Arc<CameraProbe>,
        denied: bool,
        fail_after: Option<u64>,
    }

    impl FakeCameras {
        fn new() -> Self {
            FakeCameras {
                probe: Arc::new(CameraProbe::default()),
                denied: false,
                fail_after: None,
            }
        }
    }

    impl CameraProvider for FakeCameras {
        fn open(&self, _constraints: &CameraConstraints) -> VroomResult<Box<dyn CameraStream>> {
            if self.denied {
                return Err(VroomError::Capability("NotAllowedError".into()));
            }
            self.probe.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeCamera {
                probe: Arc::clone(&self.probe),
                media_ms: 0,
                live: true,
                fail_after: self.fail_after,
            }))
        }
    }

    struct AlwaysFace;

    impl LandmarkModel for AlwaysFace {
        fn detect(&self, _frame: &VideoFrame, _now: Timestamp) -> VroomResult<Option<FaceDetection>> {
            let mut m = [0.0f32; 16];
            m[0] = 1.0;
            m[5] = 1.0;
            m[10] = 1.0;
            m[15] = 1.0;
            Ok(Some(FaceDetection {
                blendshapes: vec![BlendshapeSample::new("jawOpen", 0.3)],
                transform: Some(m),
            }))
        }
    }

    fn capture_loop(clock: ManualClock) -> CaptureLoop {
        let model = TrackingModel::from_model(Arc::new(AlwaysFace), ModelOptions::default());
        CaptureLoop::new(model, CaptureConfig::default(), Arc::new(clock))
    }

    #[tokio::test]
    async fn test_denied_camera_is_capability_error() {
        let capture = capture_loop(ManualClock::default());
        let cameras = FakeCameras {
            denied: true,
            ..FakeCameras::new()
        };
        let (tx, _rx) = mpsc::channel(4);

        let err = capture.start(&cameras, tx).unwrap_err();
        assert!(matches!(err, VroomError::Capability(_)));
        assert!(!capture.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let capture = capture_loop(ManualClock::default());
        let cameras = FakeCameras::new();
        let (tx, _rx) = mpsc::channel(4);

        assert!(capture.start(&cameras, tx.clone()).unwrap());
        assert!(!capture.start(&cameras, tx).unwrap());
        assert_eq!(cameras.probe.opened.load(Ordering::SeqCst), 1);
        capture.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_and_releases_on_stop() {
        let clock = ManualClock::new(Timestamp::from_millis(1_000));
        let capture = capture_loop(clock.clone());
        let cameras = FakeCameras::new();
        let (tx, mut rx) = mpsc::channel(16);

        capture.start(&cameras, tx).unwrap();
        for _ in 0..4 {
            clock.advance(Duration::from_millis(40));
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
        let first = rx.recv().await.unwrap();
        assert_eq!(first.payload.score("jawOpen"), Some(0.3));
        assert!(first.captured_at >= Timestamp::from_millis(1_000));
        assert!(first.captured_at <= clock.now());
        assert!(capture.latest().is_some());

        capture.stop();
        assert!(!capture.is_running());
        assert_eq!(cameras.probe.stopped.load(Ordering::SeqCst), 1);

        // Second stop is a no-op
        capture.stop();
        assert_eq!(cameras.probe.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emission_bounded_by_interval() {
        // Clock frozen: only the first frame may pass the 30 Hz gate
        let clock = ManualClock::new(Timestamp::from_millis(5_000));
        let capture = capture_loop(clock);
        let cameras = FakeCameras::new();
        let (tx, mut rx) = mpsc::channel(64);

        capture.start(&cameras, tx).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        capture.stop();

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 1);
        assert!(capture.stats().throttled > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_stamped_at_capture_time() {
        let clock = ManualClock::new(Timestamp::from_millis(0));
        let capture = capture_loop(clock.clone());
        let cameras = FakeCameras::new();
        let (tx, mut rx) = mpsc::channel(64);

        capture.start(&cameras, tx).unwrap();
        for _ in 0..20 {
            clock.advance(Duration::from_millis(20));
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
        capture.stop();

        let mut stamps = Vec::new();
        while let Ok(sample) = rx.try_recv() {
            stamps.push(sample.captured_at);
        }
        assert!(stamps.len() >= 2, "{stamps:?}");
        let gate = CaptureConfig::default().emit_interval;
        for pair in stamps.windows(2) {
            assert!(pair[1].saturating_since(pair[0]) >= gate, "{stamps:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_camera() {
        let cameras = FakeCameras::new();
        {
            let capture = capture_loop(ManualClock::default());
            let (tx, _rx) = mpsc::channel(4);
            capture.start(&cameras, tx).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(cameras.probe.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_failure_releases_camera() {
        let capture = capture_loop(ManualClock::default());
        let cameras = FakeCameras {
            fail_after: Some(48),
            ..FakeCameras::new()
        };
        let (tx, _rx) = mpsc::channel(4);

        capture.start(&cameras, tx).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!capture.is_running());
        assert_eq!(cameras.probe.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_consumer_stops_capture() {
        let clock = ManualClock::new(Timestamp::from_millis(0));
        let capture = capture_loop(clock.clone());
        let cameras = FakeCameras::new();
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        capture.start(&cameras, tx).unwrap();
        clock.advance(Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!capture.is_running());
        assert_eq!(cameras.probe.stopped.load(Ordering::SeqCst), 1);
    }
}
