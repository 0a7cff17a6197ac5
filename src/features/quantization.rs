//! Quantization (GCD) fit
//!
//! Scripted aim often turns in fixed angular increments (tick rate times a
//! constant turn speed). Human input does not quantize that cleanly.

use serde::{Deserialize, Serialize};

use crate::config::QuantizationSettings;
use crate::rotation::{Axis, RotationSample};

/// Best step found on one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantResult {
    pub axis: Axis,
    /// Best-fit step in degrees, 0 when no fit was attempted
    pub step: f64,
    /// Fraction of deltas within tolerance of a multiple of `step`
    pub coverage: f64,
    /// Deltas considered
    pub samples: usize,
}

impl QuantResult {
    /// The "insufficient data" result
    pub fn neutral(axis: Axis, samples: usize) -> Self {
        Self {
            axis,
            step: 0.0,
            coverage: 0.0,
            samples,
        }
    }
}

/// Distance from `value` to the nearest integer multiple of `step`
pub fn distance_to_multiple(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return f64::INFINITY;
    }
    let rem = value.abs() % step;
    rem.min(step - rem)
}

/// Count and summed residual of values within `tolerance` of a multiple of `step`
pub fn coverage_of(values: &[f64], step: f64, tolerance: f64) -> (usize, f64) {
    values
        .iter()
        .map(|&v| distance_to_multiple(v, step))
        .filter(|d| *d <= tolerance)
        .fold((0, 0.0), |(count, residual), d| (count + 1, residual + d))
}

/// Scan candidate steps in ascending order and keep the best coverage.
///
/// The first candidate to reach the maximal coverage wins, with two
/// exceptions for a later candidate of equal coverage: an integer multiple
/// of the current best replaces it (the coarser step is the greater common
/// divisor), and a neighbouring step within tolerance replaces it when it
/// sits closer to the deltas.
pub fn quantization_fit(
    samples: &[RotationSample],
    axis: Axis,
    settings: &QuantizationSettings,
) -> QuantResult {
    let deltas: Vec<f64> = samples
        .iter()
        .map(|s| s.delta(axis).abs())
        .filter(|d| *d >= settings.min_abs_delta)
        .collect();
    let n = deltas.len();

    if n < settings.min_deltas
        || n == 0
        || settings.resolution <= 0.0
        || settings.step_min <= 0.0
        || settings.step_max < settings.step_min
    {
        return QuantResult::neutral(axis, n);
    }

    let candidates = ((settings.step_max - settings.step_min) / settings.resolution).floor() as usize;
    let mut best_step = 0.0;
    let mut best_ok = 0usize;
    let mut best_residual = 0.0;

    for k in 0..=candidates {
        let step = settings.step_min + k as f64 * settings.resolution;
        let tolerance = settings.tolerance(step);
        let (ok, residual) = coverage_of(&deltas, step, tolerance);

        let replaces = ok > best_ok
            || (ok == best_ok
                && ok > 0
                && (is_harmonic(step, best_step, tolerance)
                    || ((step - best_step).abs() <= tolerance && residual < best_residual)));
        if replaces {
            best_ok = ok;
            best_step = step;
            best_residual = residual;
        }
    }

    QuantResult {
        axis,
        step: best_step,
        coverage: best_ok as f64 / n as f64,
        samples: n,
    }
}

fn is_harmonic(candidate: f64, base: f64, tolerance: f64) -> bool {
    if base <= 0.0 {
        return false;
    }
    let k = (candidate / base).round();
    k >= 2.0 && (candidate - k * base).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaw_samples(deltas: &[f64]) -> Vec<RotationSample> {
        let mut yaw = 0.0;
        deltas
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let s = RotationSample::from_rotation(i as u64 * 50, yaw, yaw + d, 0.0, 0.0);
                yaw = s.yaw_after;
                s
            })
            .collect()
    }

    #[test]
    fn test_distance_to_multiple() {
        assert!(distance_to_multiple(4.0, 2.0) < 1e-12);
        assert!((distance_to_multiple(4.9, 2.0) - 0.9).abs() < 1e-12);
        assert!((distance_to_multiple(-5.9, 2.0) - 0.1).abs() < 1e-9);
        assert!(distance_to_multiple(1.0, 0.0).is_infinite());
    }

    #[test]
    fn test_exact_multiples_of_two_degrees() {
        let deltas = [2.0, -4.0, 6.0, -2.0, 8.0, -6.0, 4.0, -8.0, 2.0, -4.0, 6.0, -2.0];
        let fit = quantization_fit(&yaw_samples(&deltas), Axis::Yaw, &QuantizationSettings::default());

        assert_eq!(fit.coverage, 1.0);
        assert!((fit.step - 2.0).abs() <= 0.0025, "step was {}", fit.step);
        assert_eq!(fit.samples, deltas.len());
    }

    #[test]
    fn test_exact_multiples_of_half_degree() {
        let deltas = [0.5, 1.0, 1.5, 2.0, 0.5, 3.0, 1.0, 2.5, 0.5, 1.5];
        let fit = quantization_fit(&yaw_samples(&deltas), Axis::Yaw, &QuantizationSettings::default());

        assert_eq!(fit.coverage, 1.0);
        assert!((fit.step - 0.5).abs() <= 0.0025, "step was {}", fit.step);
    }

    #[test]
    fn test_too_few_deltas_is_neutral() {
        let deltas = [2.0, 4.0, 6.0, 0.1, 0.2];
        let fit = quantization_fit(&yaw_samples(&deltas), Axis::Yaw, &QuantizationSettings::default());
        assert_eq!(fit, QuantResult::neutral(Axis::Yaw, 3));
    }

    #[test]
    fn test_irregular_deltas_do_not_fully_quantize() {
        let deltas = [
            1.3747, 4.9153, 2.0355, 7.7746, 3.3148, 0.8352, 5.5945, 9.1354, 2.7147, 6.4853,
            1.1946, 3.9754, 8.4148, 0.6753,
        ];
        let fit = quantization_fit(&yaw_samples(&deltas), Axis::Yaw, &QuantizationSettings::default());
        assert!(fit.coverage < 0.95, "coverage was {}", fit.coverage);
    }
}
