//! Coarse rotation pattern classification
//!
//! A cheap, human-readable label for a window. It is reported alongside a
//! flag but never contributes to the score.

use serde::{Deserialize, Serialize};

use crate::rotation::RotationSample;

const SMOOTH_VARIANCE_MAX: f64 = 0.5;
const SMOOTH_MEAN_MIN: f64 = 5.0;
const SNAP_YAW_MIN: f64 = 45.0;
const SNAP_PITCH_MIN: f64 = 30.0;
const SNAP_SHARE: f64 = 0.6;
const IDENTICAL_TOLERANCE: f64 = 0.1;
const IDENTICAL_SHARE: f64 = 0.7;
const SIGNIFICANT_DELTA: f64 = 1.0;

/// Coarse label for a window of rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationPattern {
    /// Large, nearly constant rotation speed
    SmoothAim,
    /// Most updates are large instantaneous turns
    SnapAim,
    /// Consecutive updates repeat the same deltas
    Robotic,
    /// Nothing above the significance floor
    NoRotation,
    /// None of the above
    Legitimate,
    /// Fewer than three samples
    InsufficientData,
}

impl RotationPattern {
    /// Classify a window
    pub fn classify(samples: &[RotationSample]) -> Self {
        if samples.len() < 3 {
            return RotationPattern::InsufficientData;
        }

        let n = samples.len() as f64;
        let mean = samples.iter().map(RotationSample::magnitude).sum::<f64>() / n;
        let variance = samples
            .iter()
            .map(|s| (s.magnitude() - mean).powi(2))
            .sum::<f64>()
            / n;

        if variance < SMOOTH_VARIANCE_MAX && mean > SMOOTH_MEAN_MIN {
            return RotationPattern::SmoothAim;
        }

        let snaps = samples
            .iter()
            .filter(|s| s.yaw_delta.abs() > SNAP_YAW_MIN || s.pitch_delta.abs() > SNAP_PITCH_MIN)
            .count();
        if snaps as f64 >= n * SNAP_SHARE {
            return RotationPattern::SnapAim;
        }

        let identical = samples
            .windows(2)
            .filter(|w| {
                (w[1].yaw_delta - w[0].yaw_delta).abs() < IDENTICAL_TOLERANCE
                    && (w[1].pitch_delta - w[0].pitch_delta).abs() < IDENTICAL_TOLERANCE
            })
            .count();
        if identical as f64 >= n * IDENTICAL_SHARE {
            return RotationPattern::Robotic;
        }

        let significant = samples
            .iter()
            .any(|s| s.yaw_delta.abs() > SIGNIFICANT_DELTA || s.pitch_delta.abs() > SIGNIFICANT_DELTA);
        if !significant {
            return RotationPattern::NoRotation;
        }

        RotationPattern::Legitimate
    }
}

impl std::fmt::Display for RotationPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RotationPattern::SmoothAim => "smooth",
            RotationPattern::SnapAim => "snap",
            RotationPattern::Robotic => "robotic",
            RotationPattern::NoRotation => "none",
            RotationPattern::Legitimate => "legit",
            RotationPattern::InsufficientData => "insufficient",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_deltas(deltas: &[(f64, f64)]) -> Vec<RotationSample> {
        deltas
            .iter()
            .enumerate()
            .map(|(i, &(dy, dp))| RotationSample::from_rotation(i as u64 * 50, 0.0, dy, 0.0, dp))
            .collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(RotationPattern::classify(&[]), RotationPattern::InsufficientData);

        let smooth: Vec<_> = (0..10).map(|_| (6.0, 1.0)).collect();
        assert_eq!(RotationPattern::classify(&from_deltas(&smooth)), RotationPattern::SmoothAim);

        let snaps: Vec<_> = (0..10)
            .map(|i| if i % 2 == 0 { (60.0, 0.0) } else { (-70.0, 5.0) })
            .collect();
        assert_eq!(RotationPattern::classify(&from_deltas(&snaps)), RotationPattern::SnapAim);

        let robotic: Vec<_> = (0..10).map(|_| (1.5, 0.5)).collect();
        assert_eq!(RotationPattern::classify(&from_deltas(&robotic)), RotationPattern::Robotic);

        let still: Vec<_> = (0..10).map(|i| (0.3 * (i % 3) as f64, 0.1)).collect();
        assert_eq!(RotationPattern::classify(&from_deltas(&still)), RotationPattern::NoRotation);

        let human = [(3.0, 0.5), (-1.2, 0.8), (7.5, -2.0), (0.4, 0.1), (-5.0, 1.5)];
        assert_eq!(RotationPattern::classify(&from_deltas(&human)), RotationPattern::Legitimate);
    }
}
