//! Speed, smoothness and micro-correction extractors

use serde::{Deserialize, Serialize};

use crate::config::FeatureSettings;
use crate::rotation::{Axis, RotationSample};

/// Constant-speed ratio over significant rotations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstSpeed {
    pub ratio: f64,
    pub samples: usize,
}

/// Mean and spread of significant rotation speeds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RoboticStats {
    pub mean: f64,
    pub std_dev: f64,
    pub samples: usize,
}

fn speeds(samples: &[RotationSample], floor: f64) -> Vec<f64> {
    samples
        .iter()
        .map(RotationSample::magnitude)
        .filter(|m| *m >= floor)
        .collect()
}

/// Fraction of consecutive significant speeds that differ by less than the tolerance
pub fn constant_speed(samples: &[RotationSample], settings: &FeatureSettings) -> ConstSpeed {
    let sp = speeds(samples, settings.speed_floor);
    if sp.len() < settings.const_speed_min_samples.max(2) {
        return ConstSpeed {
            ratio: 0.0,
            samples: sp.len(),
        };
    }

    let close = sp
        .windows(2)
        .filter(|w| (w[1] - w[0]).abs() < settings.speed_tolerance)
        .count();
    ConstSpeed {
        ratio: close as f64 / (sp.len() - 1) as f64,
        samples: sp.len(),
    }
}

/// Mean and population standard deviation of significant speeds.
///
/// Below the minimum count the mean is 0, which no robotic threshold accepts.
pub fn robotic_consistency(samples: &[RotationSample], settings: &FeatureSettings) -> RoboticStats {
    let sp = speeds(samples, settings.speed_floor);
    if sp.len() < settings.robotic_min_samples.max(1) {
        return RoboticStats {
            mean: 0.0,
            std_dev: 0.0,
            samples: sp.len(),
        };
    }

    let n = sp.len() as f64;
    let mean = sp.iter().sum::<f64>() / n;
    let var = sp.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    RoboticStats {
        mean,
        std_dev: var.sqrt(),
        samples: sp.len(),
    }
}

fn linearity_on(samples: &[RotationSample], axis: Axis, settings: &FeatureSettings) -> f64 {
    if samples.len() < settings.linear_min_samples.max(3) {
        return 0.0;
    }
    let d: Vec<f64> = samples.iter().map(|s| s.delta(axis)).collect();
    let total = d.len() - 2;
    let linear = d
        .windows(3)
        .filter(|w| {
            let a1 = w[1] - w[0];
            let a2 = w[2] - w[1];
            a1.abs() < settings.linear_tolerance
                && a2.abs() < settings.linear_tolerance
                && w[1].abs() > settings.linear_min_delta
        })
        .count();
    linear as f64 / total as f64
}

/// Share of delta triples turning at a constant, non-trivial angular velocity
/// (best of both axes)
pub fn linearity(samples: &[RotationSample], settings: &FeatureSettings) -> f64 {
    linearity_on(samples, Axis::Yaw, settings).max(linearity_on(samples, Axis::Pitch, settings))
}

/// Share of near-zero jerk (second difference of the yaw delta series)
pub fn jerk_zero_share(samples: &[RotationSample], settings: &FeatureSettings) -> f64 {
    if samples.len() < settings.jerk_min_samples.max(3) {
        return 0.0;
    }
    let d: Vec<f64> = samples.iter().map(|s| s.yaw_delta).collect();
    let acc: Vec<f64> = d.windows(2).map(|w| w[1] - w[0]).collect();
    let jerk: Vec<f64> = acc.windows(2).map(|w| w[1] - w[0]).collect();
    if jerk.is_empty() {
        return 0.0;
    }

    let zero = jerk
        .iter()
        .filter(|j| j.abs() < settings.jerk_zero_tolerance)
        .count();
    zero as f64 / jerk.len() as f64
}

/// Fraction of samples inside the micro-correction band
pub fn micro_ratio(samples: &[RotationSample], settings: &FeatureSettings) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let micro = samples
        .iter()
        .map(RotationSample::magnitude)
        .filter(|m| *m > settings.micro_band_low && *m < settings.micro_band_high)
        .count();
    micro as f64 / samples.len() as f64
}

/// Mean rotation magnitude, 0 for an empty window
pub fn mean_magnitude(samples: &[RotationSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(RotationSample::magnitude).sum::<f64>() / samples.len() as f64
}

/// Large moves with almost no small corrective moves
pub fn lacks_micro_corrections(samples: &[RotationSample], settings: &FeatureSettings) -> bool {
    !samples.is_empty()
        && micro_ratio(samples, settings) < settings.no_micro_ratio_max
        && mean_magnitude(samples) > settings.no_micro_mean_min
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_deltas(deltas: &[(f64, f64)]) -> Vec<RotationSample> {
        deltas
            .iter()
            .enumerate()
            .map(|(i, &(dy, dp))| RotationSample {
                timestamp: i as u64 * 50,
                yaw_before: 0.0,
                yaw_after: dy,
                pitch_before: 0.0,
                pitch_after: dp,
                yaw_delta: dy,
                pitch_delta: dp,
            })
            .collect()
    }

    #[test]
    fn test_constant_speed_uniform() {
        let deltas: Vec<(f64, f64)> = (0..12).map(|i| (6.0 + (i % 2) as f64 * 0.3, 0.0)).collect();
        let cs = constant_speed(&from_deltas(&deltas), &FeatureSettings::default());
        assert_eq!(cs.samples, 12);
        assert_eq!(cs.ratio, 1.0);
    }

    #[test]
    fn test_constant_speed_insufficient() {
        let deltas = [(6.0, 0.0), (6.0, 0.0), (0.5, 0.0)];
        let cs = constant_speed(&from_deltas(&deltas), &FeatureSettings::default());
        assert_eq!(cs, ConstSpeed { ratio: 0.0, samples: 2 });
    }

    #[test]
    fn test_robotic_stats() {
        let deltas: Vec<(f64, f64)> = [4.0, 6.0, 4.0, 6.0].iter().map(|&d| (d, 0.0)).collect();
        let stats = robotic_consistency(&from_deltas(&deltas), &FeatureSettings::default());
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 1.0);
        assert_eq!(stats.samples, 4);
    }

    #[test]
    fn test_linearity_constant_velocity() {
        let deltas: Vec<(f64, f64)> = (0..12).map(|_| (3.0, 0.0)).collect();
        assert_eq!(linearity(&from_deltas(&deltas), &FeatureSettings::default()), 1.0);

        let still: Vec<(f64, f64)> = (0..12).map(|_| (0.2, 0.0)).collect();
        assert_eq!(linearity(&from_deltas(&still), &FeatureSettings::default()), 0.0);
    }

    #[test]
    fn test_jerk_zero_share_smooth_ramp() {
        // Constant acceleration has zero jerk.
        let deltas: Vec<(f64, f64)> = (0..12).map(|i| (1.0 + i as f64 * 0.5, 0.0)).collect();
        assert_eq!(jerk_zero_share(&from_deltas(&deltas), &FeatureSettings::default()), 1.0);

        let jagged: Vec<(f64, f64)> = (0..12).map(|i| (if i % 2 == 0 { 1.0 } else { 5.0 }, 0.0)).collect();
        assert_eq!(jerk_zero_share(&from_deltas(&jagged), &FeatureSettings::default()), 0.0);
    }

    #[test]
    fn test_micro_corrections() {
        let settings = FeatureSettings::default();
        let human: Vec<(f64, f64)> = (0..12)
            .map(|i| if i % 3 == 0 { (8.0, 1.0) } else { (0.6, 0.3) })
            .collect();
        let samples = from_deltas(&human);
        assert!(micro_ratio(&samples, &settings) > 0.6);
        assert!(!lacks_micro_corrections(&samples, &settings));

        let bot: Vec<(f64, f64)> = (0..12).map(|_| (7.0, 2.0)).collect();
        let samples = from_deltas(&bot);
        assert_eq!(micro_ratio(&samples, &settings), 0.0);
        assert!(lacks_micro_corrections(&samples, &settings));
    }

    #[test]
    fn test_empty_window_is_neutral() {
        let settings = FeatureSettings::default();
        assert_eq!(micro_ratio(&[], &settings), 0.0);
        assert!(!lacks_micro_corrections(&[], &settings));
        assert_eq!(jerk_zero_share(&[], &settings), 0.0);
        assert_eq!(linearity(&[], &settings), 0.0);
        assert_eq!(robotic_consistency(&[], &settings).mean, 0.0);
    }
}
