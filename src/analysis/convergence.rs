//! Snap-to-target convergence
//!
//! After an attack the angular error between the subject's aim and the live
//! target is sampled for a short window. Assisted aim collapses that error
//! geometrically, each update closing a fixed fraction of the remaining gap.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::ConvergenceSettings;
use crate::rotation::{AimError, Timestamp};
use crate::TargetId;

/// One angular error observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AimSample {
    pub timestamp: Timestamp,
    pub yaw_error: f64,
    pub pitch_error: f64,
    pub combined_error: f64,
}

/// Outcome of evaluating an error series
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ConvergenceResult {
    pub strong_steps: usize,
    pub geometric_mean: f64,
    pub initial_error: f64,
    pub final_error: f64,
    pub positive: bool,
}

/// Score an error series for geometric contraction
pub fn evaluate_errors(errors: &[f64], settings: &ConvergenceSettings) -> ConvergenceResult {
    let (Some(&first), Some(&last)) = (errors.first(), errors.last()) else {
        return ConvergenceResult {
            geometric_mean: 1.0,
            ..ConvergenceResult::default()
        };
    };

    let mut strong_steps = 0;
    let mut log_sum = 0.0;
    let mut steps = 0usize;
    for w in errors.windows(2) {
        let (e0, e1) = (w[0], w[1]);
        if e0 < settings.min_error {
            continue;
        }
        let ratio = e1 / e0;
        if ratio <= settings.strong_ratio {
            strong_steps += 1;
        }
        log_sum += ratio.clamp(settings.ratio_min, settings.ratio_max).ln();
        steps += 1;
    }

    let geometric_mean = if steps == 0 {
        1.0
    } else {
        (log_sum / steps as f64).exp()
    };
    let final_limit = settings.final_error_floor.max(first * settings.final_error_fraction);

    ConvergenceResult {
        strong_steps,
        geometric_mean,
        initial_error: first,
        final_error: last,
        positive: strong_steps >= settings.min_strong_steps
            && geometric_mean <= settings.geometric_mean_max
            && last <= final_limit,
    }
}

/// Observation window opened by one attack
#[derive(Debug, Clone)]
pub struct AimConvergenceWindow {
    target: TargetId,
    opened_at: Timestamp,
    evaluated: bool,
    samples: VecDeque<AimSample>,
}

impl AimConvergenceWindow {
    pub fn open(target: TargetId, now: Timestamp) -> Self {
        Self {
            target,
            opened_at: now,
            evaluated: false,
            samples: VecDeque::new(),
        }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_expired(&self, now: Timestamp, settings: &ConvergenceSettings) -> bool {
        now.saturating_sub(self.opened_at) > settings.window_ms
    }

    /// Append an error sample, dropping the oldest past the cap
    pub fn record(&mut self, timestamp: Timestamp, error: AimError, settings: &ConvergenceSettings) {
        self.samples.push_back(AimSample {
            timestamp,
            yaw_error: error.yaw_error,
            pitch_error: error.pitch_error,
            combined_error: error.combined,
        });
        while self.samples.len() > settings.max_samples {
            self.samples.pop_front();
        }
    }

    /// Evaluate once enough samples exist. Later calls return `None`.
    pub fn evaluate(&mut self, settings: &ConvergenceSettings) -> Option<ConvergenceResult> {
        if self.evaluated || self.samples.len() < settings.min_samples {
            return None;
        }
        self.evaluated = true;

        let errors: Vec<f64> = self.samples.iter().map(|s| s.combined_error).collect();
        let result = evaluate_errors(&errors, settings);
        log::trace!(
            "convergence window for {}: strong={} gmean={:.3} positive={}",
            self.target,
            result.strong_steps,
            result.geometric_mean,
            result.positive
        );
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(combined: f64) -> AimError {
        AimError {
            yaw_error: combined,
            pitch_error: 0.0,
            combined,
        }
    }

    fn halving(start: f64, count: usize) -> Vec<f64> {
        (0..count).map(|i| start / 2f64.powi(i as i32)).collect()
    }

    #[test]
    fn test_geometric_collapse_is_positive() {
        let settings = ConvergenceSettings::default();
        let errors = halving(60.0, 7);
        assert_eq!(*errors.last().unwrap(), 0.9375);

        let result = evaluate_errors(&errors, &settings);
        assert_eq!(result.strong_steps, 6);
        assert!((result.geometric_mean - 0.5).abs() < 1e-9);
        assert!(result.positive);
    }

    #[test]
    fn test_slow_drift_is_negative() {
        let settings = ConvergenceSettings::default();
        let errors: Vec<f64> = (0..10).map(|i| 30.0 - i as f64 * 2.0).collect();
        let result = evaluate_errors(&errors, &settings);
        assert_eq!(result.strong_steps, 0);
        assert!(!result.positive);
    }

    #[test]
    fn test_collapse_that_stalls_far_away_is_negative() {
        let settings = ConvergenceSettings::default();
        let errors = [80.0, 40.0, 20.0, 10.0, 10.0, 10.0, 10.0];
        let result = evaluate_errors(&errors, &settings);
        assert_eq!(result.strong_steps, 3);
        assert!(!result.positive);
    }

    #[test]
    fn test_zero_errors_are_skipped() {
        let settings = ConvergenceSettings::default();
        let result = evaluate_errors(&[0.0, 0.0, 0.0], &settings);
        assert_eq!(result.strong_steps, 0);
        assert_eq!(result.geometric_mean, 1.0);
        assert!(!result.positive);
        assert!(!evaluate_errors(&[], &settings).positive);
    }

    #[test]
    fn test_window_evaluates_at_most_once() {
        let settings = ConvergenceSettings::default();
        let mut window = AimConvergenceWindow::open(TargetId(7), 1000);
        for (i, e) in halving(60.0, 7).into_iter().enumerate() {
            window.record(1000 + i as u64 * 50, err(e), &settings);
        }

        let first = window.evaluate(&settings).unwrap();
        assert!(first.positive);
        assert!(window.is_evaluated());
        assert!(window.evaluate(&settings).is_none());
    }

    #[test]
    fn test_window_waits_for_min_samples() {
        let settings = ConvergenceSettings::default();
        let mut window = AimConvergenceWindow::open(TargetId(1), 0);
        for i in 0..(settings.min_samples - 1) {
            window.record(i as u64 * 50, err(10.0), &settings);
        }
        assert!(window.evaluate(&settings).is_none());
        assert!(!window.is_evaluated());
    }

    #[test]
    fn test_window_caps_and_expires() {
        let settings = ConvergenceSettings::default();
        let mut window = AimConvergenceWindow::open(TargetId(1), 0);
        for i in 0..40 {
            window.record(i, err(5.0), &settings);
        }
        assert_eq!(window.len(), settings.max_samples);
        assert!(!window.is_expired(settings.window_ms, &settings));
        assert!(window.is_expired(settings.window_ms + 1, &settings));
    }
}
