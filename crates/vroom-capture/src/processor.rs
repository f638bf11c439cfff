//! Per-frame processing: detection, rotation extraction, emission gate

use std::time::Duration;

use vroom_core::{BlendshapeSample, RateLimiter, Rotation, TelemetryPayload, Timestamp};

use crate::{TrackingModel, VideoFrame};

/// What happened to one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Same media time as the last processed frame, or not started yet
    Stale,
    /// Model found no face (or failed on this frame)
    Miss,
    /// Face found; preview updated but no payload emitted
    Updated,
    /// Face found but emission was rate limited
    Throttled,
    /// Payload ready for downstream
    Emit(TelemetryPayload),
}

/// An emitted payload stamped with the clock reading it was captured at
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSample {
    pub payload: TelemetryPayload,
    pub captured_at: Timestamp,
}

impl CapturedSample {
    pub fn new(payload: TelemetryPayload, captured_at: Timestamp) -> Self {
        CapturedSample {
            payload,
            captured_at,
        }
    }
}

/// Capture counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_read: u64,
    pub frames_stale: u64,
    pub detections: u64,
    pub misses: u64,
    pub emitted: u64,
    pub throttled: u64,
    pub dropped: u64,
}

/// Turns frames into telemetry
pub struct FrameProcessor {
    model: TrackingModel,
    limiter: RateLimiter,
    last_media_time: Option<Duration>,
    rotation: Rotation,
    latest: Option<TelemetryPayload>,
    stats: CaptureStats,
}

impl FrameProcessor {
    pub fn new(model: TrackingModel, emit_interval: Duration) -> Self {
        FrameProcessor {
            model,
            limiter: RateLimiter::new(emit_interval),
            last_media_time: None,
            rotation: Rotation::ZERO,
            latest: None,
            stats: CaptureStats::default(),
        }
    }

    pub fn process(&mut self, frame: &VideoFrame, now: Timestamp) -> FrameOutcome {
        self.stats.frames_read += 1;

        if frame.media_time.is_zero() || self.last_media_time == Some(frame.media_time) {
            self.stats.frames_stale += 1;
            return FrameOutcome::Stale;
        }
        self.last_media_time = Some(frame.media_time);

        let detection = match self.model.detect(frame, now) {
            Ok(Some(d)) if !d.blendshapes.is_empty() => d,
            Ok(_) => {
                self.stats.misses += 1;
                return FrameOutcome::Miss;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Face detection failed, skipping frame");
                self.stats.misses += 1;
                return FrameOutcome::Miss;
            }
        };
        self.stats.detections += 1;

        let blendshapes: Vec<BlendshapeSample> = detection
            .blendshapes
            .into_iter()
            .map(|b| BlendshapeSample {
                score: if b.score.is_finite() {
                    b.score.clamp(0.0, 1.0)
                } else {
                    0.0
                },
                category_name: b.category_name,
            })
            .collect();

        let Some(transform) = detection.transform else {
            // Preview keeps the last known head pose
            self.latest = Some(TelemetryPayload::new(blendshapes, self.rotation));
            return FrameOutcome::Updated;
        };

        let rotation = Rotation::from_transform(&transform);
        if rotation.is_finite() {
            self.rotation = rotation;
        }
        let payload = TelemetryPayload::new(blendshapes, self.rotation);
        self.latest = Some(payload.clone());

        if self.limiter.try_acquire(now) {
            self.stats.emitted += 1;
            FrameOutcome::Emit(payload)
        } else {
            self.stats.throttled += 1;
            FrameOutcome::Throttled
        }
    }

    /// Latest detected face state, independent of the emission gate
    pub fn latest(&self) -> Option<&TelemetryPayload> {
        self.latest.as_ref()
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub(crate) fn record_dropped(&mut self) {
        self.stats.dropped += 1;
    }
}
