//! Rotation samples

use serde::{Deserialize, Serialize};

use super::angles::{clamp_pitch, pitch_delta, wrap_degrees, yaw_delta};

/// Milliseconds on the host's clock
pub type Timestamp = u64;

/// Which rotation axis a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Yaw,
    Pitch,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Yaw => write!(f, "Yaw"),
            Axis::Pitch => write!(f, "Pitch"),
        }
    }
}

/// One orientation update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationSample {
    pub timestamp: Timestamp,
    pub yaw_before: f64,
    pub yaw_after: f64,
    pub pitch_before: f64,
    pub pitch_after: f64,
    /// Signed shortest-arc yaw change
    pub yaw_delta: f64,
    /// Signed pitch change
    pub pitch_delta: f64,
}

impl RotationSample {
    /// Build a sample from raw orientations, normalizing both axes
    pub fn from_rotation(
        timestamp: Timestamp,
        from_yaw: f64,
        to_yaw: f64,
        from_pitch: f64,
        to_pitch: f64,
    ) -> Self {
        Self {
            timestamp,
            yaw_before: wrap_degrees(from_yaw),
            yaw_after: wrap_degrees(to_yaw),
            pitch_before: clamp_pitch(from_pitch),
            pitch_after: clamp_pitch(to_pitch),
            yaw_delta: yaw_delta(from_yaw, to_yaw),
            pitch_delta: pitch_delta(from_pitch, to_pitch),
        }
    }

    /// Delta on one axis
    pub fn delta(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Yaw => self.yaw_delta,
            Axis::Pitch => self.pitch_delta,
        }
    }

    /// Angular speed of this update (Euclidean norm of both deltas)
    pub fn magnitude(&self) -> f64 {
        self.yaw_delta.hypot(self.pitch_delta)
    }

    /// Whether both deltas are below `min_delta`
    pub fn is_degenerate(&self, min_delta: f64) -> bool {
        self.yaw_delta.abs() < min_delta && self.pitch_delta.abs() < min_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rotation_wraps() {
        let s = RotationSample::from_rotation(10, 179.0, -179.0, 10.0, 12.5);
        assert_eq!(s.yaw_delta, 2.0);
        assert_eq!(s.pitch_delta, 2.5);
        assert_eq!(s.yaw_after, -179.0);
        assert_eq!(s.delta(Axis::Pitch), 2.5);
    }

    #[test]
    fn test_magnitude_and_degenerate() {
        let s = RotationSample::from_rotation(0, 0.0, 3.0, 0.0, 4.0);
        assert_eq!(s.magnitude(), 5.0);
        assert!(!s.is_degenerate(0.02));

        let still = RotationSample::from_rotation(0, 5.0, 5.01, 0.0, 0.0);
        assert!(still.is_degenerate(0.02));
    }
}
