//! Feature extraction
//!
//! Pure functions over a window of rotation samples. Every extractor returns
//! a neutral value (0, `false`, or a zero-step fit) when the window is below
//! its minimum count, and neutral values never satisfy an evidence group on
//! their own.

pub mod distribution;
pub mod kinematics;
pub mod pattern;
pub mod periodicity;
pub mod quantization;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::rotation::{Axis, RotationSample};

pub use kinematics::{ConstSpeed, RoboticStats};
pub use pattern::RotationPattern;
pub use quantization::QuantResult;

/// All extractor outputs for one analysis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub quant_yaw: QuantResult,
    pub quant_pitch: QuantResult,
    /// The axis with the higher coverage (yaw on ties)
    pub quant_best: QuantResult,
    pub oscillation: f64,
    pub circularity: f64,
    pub const_speed: ConstSpeed,
    pub robotic: RoboticStats,
    pub linearity: f64,
    pub lacks_micro: bool,
    pub micro_ratio: f64,
    pub jerk_zero_share: f64,
    pub spectral_peak: f64,
    pub autocorrelation: f64,
    pub mean_magnitude: f64,
    pub pattern: RotationPattern,
    pub samples: usize,
}

impl Feature {
    /// Run every extractor over `samples`
    pub fn compute(samples: &[RotationSample], settings: &Settings) -> Self {
        let fs = &settings.features;
        let quant_yaw = quantization::quantization_fit(samples, Axis::Yaw, &settings.quantization);
        let quant_pitch = quantization::quantization_fit(samples, Axis::Pitch, &settings.quantization);
        let quant_best = if quant_yaw.coverage >= quant_pitch.coverage {
            quant_yaw
        } else {
            quant_pitch
        };

        Self {
            quant_yaw,
            quant_pitch,
            quant_best,
            oscillation: periodicity::oscillation_index(samples, Axis::Yaw, fs)
                .max(periodicity::oscillation_index(samples, Axis::Pitch, fs)),
            circularity: periodicity::circularity_index(samples, fs),
            const_speed: kinematics::constant_speed(samples, fs),
            robotic: kinematics::robotic_consistency(samples, fs),
            linearity: kinematics::linearity(samples, fs),
            lacks_micro: kinematics::lacks_micro_corrections(samples, fs),
            micro_ratio: kinematics::micro_ratio(samples, fs),
            jerk_zero_share: kinematics::jerk_zero_share(samples, fs),
            spectral_peak: periodicity::spectral_peak(samples, Axis::Yaw, fs)
                .max(periodicity::spectral_peak(samples, Axis::Pitch, fs)),
            autocorrelation: periodicity::autocorrelation_peak(samples, Axis::Yaw, fs)
                .max(periodicity::autocorrelation_peak(samples, Axis::Pitch, fs)),
            mean_magnitude: kinematics::mean_magnitude(samples),
            pattern: RotationPattern::classify(samples),
            samples: samples.len(),
        }
    }
}
