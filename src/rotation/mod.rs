//! Rotation primitives
//!
//! Angle arithmetic, the immutable per-update sample, and the time-bounded
//! buffer each subject keeps.

pub mod angles;
pub mod buffer;
pub mod sample;

pub use angles::{clamp_pitch, wrap_degrees, AimError, Bearing, Point3};
pub use buffer::SampleBuffer;
pub use sample::{Axis, RotationSample, Timestamp};
