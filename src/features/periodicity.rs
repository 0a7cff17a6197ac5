//! Periodicity and curvature extractors
//!
//! Closed-loop aim controllers overshoot and correct back and forth, trace
//! smooth arcs, and leave narrow peaks in the delta spectrum.

use std::f64::consts::PI;

use crate::config::FeatureSettings;
use crate::rotation::{Axis, RotationSample};

/// Share of sign-alternating delta triples with large outer deltas
pub fn oscillation_index(samples: &[RotationSample], axis: Axis, settings: &FeatureSettings) -> f64 {
    let v: Vec<f64> = samples
        .iter()
        .map(|s| s.delta(axis))
        .filter(|d| d.abs() >= settings.oscillation_floor)
        .collect();
    if v.len() < settings.oscillation_min_samples.max(3) {
        return 0.0;
    }

    let matches = v
        .windows(3)
        .filter(|w| {
            let (a, b, c) = (w[0], w[1], w[2]);
            let alternates = (a > 0.0 && b < 0.0 && c > 0.0) || (a < 0.0 && b > 0.0 && c < 0.0);
            alternates && a.abs() >= settings.oscillation_peak && c.abs() >= settings.oscillation_peak
        })
        .count();

    matches as f64 / (v.len() - 2) as f64
}

/// Share of consecutive (yaw, pitch) delta pairs that turn sharply, plus a
/// small bonus for the longest run turning the same way.
///
/// Uses only vector lengths and the cross product, so it is invariant under
/// a global rotation of the delta vectors.
pub fn circularity_index(samples: &[RotationSample], settings: &FeatureSettings) -> f64 {
    let v: Vec<(f64, f64)> = samples
        .iter()
        .filter(|s| s.magnitude() >= settings.circularity_floor)
        .map(|s| (s.yaw_delta, s.pitch_delta))
        .collect();
    if v.len() < settings.circularity_min_samples.max(2) {
        return 0.0;
    }

    let mut strong = 0usize;
    let mut total = 0usize;
    let mut last_sign = 0i8;
    let mut run = 0usize;
    let mut longest_run = 0usize;

    for pair in v.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        let m1 = x1.hypot(y1);
        let m2 = x2.hypot(y2);
        if m1 < settings.circularity_floor || m2 < settings.circularity_floor {
            continue;
        }

        let cross = x1 * y2 - y1 * x2;
        let norm = cross.abs() / (m1 * m2);
        if norm >= settings.circularity_cross {
            let sign = if cross > 0.0 { 1 } else { -1 };
            run = if last_sign == 0 || sign == last_sign { run + 1 } else { 1 };
            last_sign = sign;
            longest_run = longest_run.max(run);
            strong += 1;
        }
        total += 1;
    }

    if total == 0 {
        return 0.0;
    }
    let base = strong as f64 / total as f64;
    let bonus = (longest_run as f64 * settings.circularity_bonus_step).min(settings.circularity_bonus_max);
    (base + bonus).min(1.0)
}

fn centered(samples: &[RotationSample], axis: Axis) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    let mean = samples.iter().map(|s| s.delta(axis)).sum::<f64>() / n as f64;
    samples.iter().map(|s| s.delta(axis) - mean).collect()
}

/// Largest one-sided DFT bin magnitude over the sum of all non-DC bins.
///
/// Direct O(N^2) summation; N is the analysis window.
pub fn spectral_peak(samples: &[RotationSample], axis: Axis, settings: &FeatureSettings) -> f64 {
    let n = samples.len();
    if n < settings.spectral_min_samples.max(2) {
        return 0.0;
    }
    let x = centered(samples, axis);

    let mut max_mag = 0.0_f64;
    let mut sum_mag = 0.0;
    for k in 1..=n / 2 {
        let (mut re, mut im) = (0.0, 0.0);
        for (i, value) in x.iter().enumerate() {
            let angle = -2.0 * PI * (k * i) as f64 / n as f64;
            re += value * angle.cos();
            im += value * angle.sin();
        }
        let mag = re.hypot(im);
        sum_mag += mag;
        max_mag = max_mag.max(mag);
    }

    if sum_mag <= 1e-6 {
        return 0.0;
    }
    max_mag / sum_mag
}

/// Maximum normalized autocorrelation over lags 2..=max_lag, clamped to [0, 1]
pub fn autocorrelation_peak(samples: &[RotationSample], axis: Axis, settings: &FeatureSettings) -> f64 {
    let n = samples.len();
    if n < settings.autocorr_min_samples.max(3) {
        return 0.0;
    }
    let x = centered(samples, axis);

    let denom: f64 = x.iter().map(|v| v * v).sum();
    if denom < 1e-6 {
        return 0.0;
    }

    let best = (2..=settings.autocorr_max_lag.min(n - 1))
        .map(|lag| {
            let num: f64 = x.iter().zip(x.iter().skip(lag)).map(|(a, b)| a * b).sum();
            num / denom
        })
        .fold(0.0_f64, f64::max);

    best.clamp(0.0, 1.0)
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

    fn rotate(deltas: &[(f64, f64)], theta: f64) -> Vec<(f64, f64)> {
        let (s, c) = theta.sin_cos();
        deltas.iter().map(|&(x, y)| (x * c - y * s, x * s + y * c)).collect()
    }

    fn arc(len: usize, step_deg: f64, radius: f64) -> Vec<(f64, f64)> {
        (0..len)
            .map(|i| {
                let a = (i as f64 * step_deg).to_radians();
                (radius * a.cos(), radius * a.sin())
            })
            .collect()
    }

    #[test]
    fn test_oscillation_alternating_pattern() {
        let deltas: Vec<(f64, f64)> = (0..20)
            .map(|i| if i % 2 == 0 { (4.0, 0.0) } else { (-4.0, 0.0) })
            .collect();
        let idx = oscillation_index(&from_deltas(&deltas), Axis::Yaw, &FeatureSettings::default());
        assert_eq!(idx, 1.0);
    }

    #[test]
    fn test_oscillation_one_direction_is_zero() {
        let deltas: Vec<(f64, f64)> = (0..20).map(|i| (3.0 + i as f64 * 0.1, 0.0)).collect();
        let idx = oscillation_index(&from_deltas(&deltas), Axis::Yaw, &FeatureSettings::default());
        assert_eq!(idx, 0.0);
    }

    #[test]
    fn test_circularity_collinear_is_zero() {
        let deltas: Vec<(f64, f64)> = (0..16).map(|i| (3.0 + i as f64 * 0.5, 1.5 + i as f64 * 0.25)).collect();
        let idx = circularity_index(&from_deltas(&deltas), &FeatureSettings::default());
        assert_eq!(idx, 0.0);
    }

    #[test]
    fn test_circularity_arc_is_high() {
        let deltas = arc(16, 60.0, 3.0);
        let idx = circularity_index(&from_deltas(&deltas), &FeatureSettings::default());
        assert!(idx >= 0.9, "circularity was {idx}");
    }

    #[test]
    fn test_circularity_rotation_invariant() {
        let settings = FeatureSettings::default();
        let mut deltas = arc(12, 55.0, 4.0);
        deltas.extend_from_slice(&[(2.0, 0.2), (-1.5, 3.0), (5.0, -5.0), (0.5, 4.5)]);
        let base = circularity_index(&from_deltas(&deltas), &settings);

        for theta in [0.3_f64, 1.1, 2.9, -0.7] {
            let rotated = circularity_index(&from_deltas(&rotate(&deltas, theta)), &settings);
            assert!((base - rotated).abs() < 1e-9, "theta {theta}: {base} vs {rotated}");
        }
    }

    #[test]
    fn test_spectral_pure_tone_dominates() {
        let deltas: Vec<(f64, f64)> = (0..24)
            .map(|i| ((2.0 * PI * 3.0 * i as f64 / 24.0).sin() * 5.0, 0.0))
            .collect();
        let peak = spectral_peak(&from_deltas(&deltas), Axis::Yaw, &FeatureSettings::default());
        assert!(peak > 0.9, "peak was {peak}");
    }

    #[test]
    fn test_spectral_constant_is_zero() {
        let deltas: Vec<(f64, f64)> = (0..24).map(|_| (3.0, 0.0)).collect();
        let peak = spectral_peak(&from_deltas(&deltas), Axis::Yaw, &FeatureSettings::default());
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn test_autocorrelation_periodic_signal() {
        let deltas: Vec<(f64, f64)> = (0..24)
            .map(|i| ([4.0, 0.0, -4.0, 0.0][i % 4], 0.0))
            .collect();
        let ac = autocorrelation_peak(&from_deltas(&deltas), Axis::Yaw, &FeatureSettings::default());
        assert!(ac > 0.7, "autocorrelation was {ac}");
        assert!(ac <= 1.0);
    }

    #[test]
    fn test_short_windows_are_neutral() {
        let settings = FeatureSettings::default();
        let deltas: Vec<(f64, f64)> = (0..5).map(|i| if i % 2 == 0 { (5.0, 2.0) } else { (-5.0, -1.0) }).collect();
        let samples = from_deltas(&deltas);
        assert_eq!(oscillation_index(&samples, Axis::Yaw, &settings), 0.0);
        assert_eq!(circularity_index(&samples, &settings), 0.0);
        assert_eq!(spectral_peak(&samples, Axis::Yaw, &settings), 0.0);
        assert_eq!(autocorrelation_peak(&samples, Axis::Yaw, &settings), 0.0);
    }
}
