//! Angle arithmetic
//!
//! Yaw is wrapped to (-180, 180], pitch is clamped to [-90, 90]. Bearings use
//! the block-world convention: yaw 0 faces +Z, yaw grows clockwise seen from
//! above, negative pitch looks up.

use serde::{Deserialize, Serialize};

/// Pitch limit used when comparing aim against a bearing
const AIM_PITCH_LIMIT: f64 = 89.0;

/// Wrap an angle in degrees into (-180, 180]
pub fn wrap_degrees(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Clamp a pitch into [-90, 90]
pub fn clamp_pitch(pitch: f64) -> f64 {
    if !pitch.is_finite() {
        return 0.0;
    }
    pitch.clamp(-90.0, 90.0)
}

/// Signed shortest-arc yaw change from `from` to `to`
pub fn yaw_delta(from: f64, to: f64) -> f64 {
    wrap_degrees(wrap_degrees(to) - wrap_degrees(from))
}

/// Signed pitch change from `from` to `to`
pub fn pitch_delta(from: f64, to: f64) -> f64 {
    clamp_pitch(to) - clamp_pitch(from)
}

/// A point in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The aim reference point on an entity standing at `self`
    pub fn reference_point(&self, height: f64, height_fraction: f64) -> Self {
        Self {
            y: self.y + height * height_fraction,
            ..*self
        }
    }
}

/// An orientation (yaw, pitch) in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bearing {
    pub yaw: f64,
    pub pitch: f64,
}

impl Bearing {
    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self {
            yaw: wrap_degrees(yaw),
            pitch: clamp_pitch(pitch),
        }
    }

    /// Ideal bearing from `eye` toward `target`.
    ///
    /// Returns `None` for coincident points or non-finite coordinates.
    pub fn between(eye: Point3, target: Point3) -> Option<Self> {
        let dx = target.x - eye.x;
        let dy = target.y - eye.y;
        let dz = target.z - eye.z;
        let dist_xz = dx.hypot(dz);

        if !(dx.is_finite() && dy.is_finite() && dz.is_finite()) {
            return None;
        }
        if dist_xz < 1e-9 && dy.abs() < 1e-9 {
            return None;
        }

        let yaw = dz.atan2(dx).to_degrees() - 90.0;
        let pitch = -dy.atan2(dist_xz).to_degrees();
        Some(Self::new(yaw, pitch))
    }

    /// Angular error between this ideal bearing and an actual orientation
    pub fn error_to(&self, yaw: f64, pitch: f64) -> AimError {
        let yaw_error = yaw_delta(yaw, self.yaw).abs();
        let pitch_error = (self.pitch.clamp(-AIM_PITCH_LIMIT, AIM_PITCH_LIMIT)
            - clamp_pitch(pitch).clamp(-AIM_PITCH_LIMIT, AIM_PITCH_LIMIT))
        .abs();

        AimError {
            yaw_error,
            pitch_error,
            combined: yaw_error.hypot(pitch_error),
        }
    }
}

/// Per-axis and combined aim error in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AimError {
    pub yaw_error: f64,
    pub pitch_error: f64,
    pub combined: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees_range() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
        assert_eq!(wrap_degrees(720.0), 0.0);
        assert_eq!(wrap_degrees(f64::NAN), 0.0);
    }

    #[test]
    fn test_yaw_delta_takes_short_arc() {
        assert_eq!(yaw_delta(170.0, -170.0), 20.0);
        assert_eq!(yaw_delta(-170.0, 170.0), -20.0);
        assert_eq!(yaw_delta(10.0, 4.0), -6.0);
    }

    #[test]
    fn test_pitch_delta_clamps() {
        assert_eq!(pitch_delta(80.0, 120.0), 10.0);
        assert_eq!(pitch_delta(-10.0, 5.0), 15.0);
    }

    #[test]
    fn test_bearing_straight_ahead() {
        let eye = Point3::new(0.0, 1.62, 0.0);
        let bearing = Bearing::between(eye, Point3::new(0.0, 1.62, 5.0)).unwrap();
        assert!(bearing.yaw.abs() < 1e-9);
        assert!(bearing.pitch.abs() < 1e-9);

        let east = Bearing::between(eye, Point3::new(-5.0, 1.62, 0.0)).unwrap();
        assert!((east.yaw - 90.0).abs() < 1e-9);

        let above = Bearing::between(eye, Point3::new(0.0, 6.62, 5.0)).unwrap();
        assert!((above.pitch + 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_coincident_points() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!(Bearing::between(p, p).is_none());
    }

    #[test]
    fn test_error_to_wraps_yaw() {
        let ideal = Bearing::new(175.0, 0.0);
        let err = ideal.error_to(-175.0, 3.0);
        assert!((err.yaw_error - 10.0).abs() < 1e-9);
        assert!((err.pitch_error - 3.0).abs() < 1e-9);
        assert!((err.combined - 109.0_f64.sqrt()).abs() < 1e-9);
    }
}
