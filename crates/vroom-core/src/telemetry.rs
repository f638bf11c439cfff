//! Face telemetry - expression and head pose as state
//!
//! This is NOT landmark geometry. A telemetry payload is the minimal state a
//! remote renderer needs to pose an avatar: blendshape weights plus the head
//! rotation.

/// One blendshape weight produced by the landmark model
#[derive(Debug, Clone, PartialEq)]
pub struct BlendshapeSample {
    /// Category name (e.g. "jawOpen", "eyeBlinkLeft")
    pub category_name: String,
    /// Activation [0.0 - 1.0]
    pub score: f32,
}

impl BlendshapeSample {
    pub fn new(category_name: impl Into<String>, score: f32) -> Self {
        Self {
            category_name: category_name.into(),
            score,
        }
    }
}

/// Head rotation as Euler angles in radians, intrinsic XYZ order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Rotation {
    pub const ZERO: Rotation = Rotation {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Extract XYZ Euler angles from a 4x4 column-major transform.
    ///
    /// Only the upper 3x3 is read and it is assumed to be unscaled.
    pub fn from_transform(m: &[f32; 16]) -> Self {
        let m11 = m[0] as f64;
        let m12 = m[4] as f64;
        let m13 = m[8] as f64;
        let m22 = m[5] as f64;
        let m23 = m[9] as f64;
        let m32 = m[6] as f64;
        let m33 = m[10] as f64;

        let y = m13.clamp(-1.0, 1.0).asin();

        if m13.abs() < 0.999_999_9 {
            Rotation {
                x: (-m23).atan2(m33),
                y,
                z: (-m12).atan2(m11),
            }
        } else {
            // Gimbal lock: roll folds into x
            Rotation {
                x: m32.atan2(m22),
                y,
                z: 0.0,
            }
        }
    }
}

/// Latest-value face state for one participant.
///
/// Immutable once built; a new capture tick produces a new payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryPayload {
    blendshapes: Vec<BlendshapeSample>,
    rotation: Rotation,
}

impl TelemetryPayload {
    pub fn new(blendshapes: Vec<BlendshapeSample>, rotation: Rotation) -> Self {
        Self {
            blendshapes,
            rotation,
        }
    }

    /// No face data yet
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn blendshapes(&self) -> &[BlendshapeSample] {
        &self.blendshapes
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_empty(&self) -> bool {
        self.blendshapes.is_empty()
    }

    /// Score of a named category, if present
    pub fn score(&self, category: &str) -> Option<f32> {
        self.blendshapes
            .iter()
            .find(|b| b.category_name == category)
            .map(|b| b.score)
    }

    pub fn into_parts(self) -> (Vec<BlendshapeSample>, Rotation) {
        (self.blendshapes, self.rotation)
    }
}
