//! Camera abstraction
//!
//! The platform camera (browser media devices, V4L, AVFoundation...) lives
//! behind these traits. A stream is exclusively owned by one capture loop.

use std::time::Duration;

use bytes::Bytes;
use vroom_core::VroomResult;

/// Requested capture format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConstraints {
    pub width: u32,
    pub height: u32,
    /// Telemetry capture never needs the microphone
    pub audio: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        CameraConstraints {
            width: 1280,
            height: 720,
            audio: false,
        }
    }
}

/// A decoded camera frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Media time of the frame; unchanged between repaints of the same frame
    pub media_time: Duration,
    /// Pixel data (RGBA)
    pub data: Bytes,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, media_time: Duration, data: Bytes) -> Self {
        VideoFrame {
            width,
            height,
            media_time,
            data,
        }
    }
}

/// Opens camera streams
pub trait CameraProvider: Send + Sync {
    /// Acquire a stream. Permission denial or a missing device must be
    /// reported as `VroomError::Capability`.
    fn open(&self, constraints: &CameraConstraints) -> VroomResult<Box<dyn CameraStream>>;
}

/// A live camera stream
pub trait CameraStream: Send {
    /// Current frame, or `None` if the stream has nothing to show yet
    fn current_frame(&mut self) -> VroomResult<Option<VideoFrame>>;

    /// Stop every track and detach from any video sink. Idempotent.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}
