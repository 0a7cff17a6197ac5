//! Quantization step persistence across analysis passes

use serde::Serialize;

use crate::analysis::baseline::Baseline;
use crate::config::PersistenceSettings;
use crate::features::QuantResult;

/// Result of feeding one pass into the tracker
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PersistenceVerdict {
    /// Step held long enough and differs from the idle step
    pub persistent: bool,
    pub persist_count: u32,
    /// The current step matches the subject's own idle step
    pub baseline_same: bool,
}

/// Tracks whether a strong quantization step stays the same between passes
#[derive(Debug, Clone, Default)]
pub struct GcdPersistenceTracker {
    last_stable_step: f64,
    persist_count: u32,
}

impl GcdPersistenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist_count(&self) -> u32 {
        self.persist_count
    }

    pub fn last_stable_step(&self) -> f64 {
        self.last_stable_step
    }

    fn is_strong(best: &QuantResult, settings: &PersistenceSettings) -> bool {
        best.coverage >= settings.lock_coverage
            && best.samples >= settings.min_samples
            && best.step > settings.min_step
            && best.step <= settings.max_step
    }

    /// Feed the best quantization fit of one pass
    pub fn update(
        &mut self,
        best: &QuantResult,
        baseline: Option<&Baseline>,
        settings: &PersistenceSettings,
    ) -> PersistenceVerdict {
        if Self::is_strong(best, settings) {
            if (best.step - self.last_stable_step).abs() < settings.step_tolerance {
                self.persist_count += 1;
            } else {
                self.last_stable_step = best.step;
                self.persist_count = 1;
            }
        } else {
            self.persist_count = self.persist_count.saturating_sub(1);
        }

        let baseline_same = baseline
            .and_then(|b| b.step_for(best.axis))
            .is_some_and(|idle| (idle - best.step).abs() < settings.baseline_same_tolerance);

        PersistenceVerdict {
            persistent: self.persist_count >= settings.required_persist && !baseline_same,
            persist_count: self.persist_count,
            baseline_same,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::Axis;

    fn fit(step: f64, coverage: f64) -> QuantResult {
        QuantResult {
            axis: Axis::Yaw,
            step,
            coverage,
            samples: 20,
        }
    }

    #[test]
    fn test_persists_after_required_passes() {
        let settings = PersistenceSettings::default();
        let mut tracker = GcdPersistenceTracker::new();

        assert!(!tracker.update(&fit(2.0, 1.0), None, &settings).persistent);
        assert!(!tracker.update(&fit(2.001, 1.0), None, &settings).persistent);
        let verdict = tracker.update(&fit(2.0, 1.0), None, &settings);
        assert!(verdict.persistent);
        assert_eq!(verdict.persist_count, 3);
    }

    #[test]
    fn test_step_change_restarts_count() {
        let settings = PersistenceSettings::default();
        let mut tracker = GcdPersistenceTracker::new();

        tracker.update(&fit(2.0, 1.0), None, &settings);
        tracker.update(&fit(2.0, 1.0), None, &settings);
        let verdict = tracker.update(&fit(1.5, 1.0), None, &settings);
        assert_eq!(verdict.persist_count, 1);
        assert_eq!(tracker.last_stable_step(), 1.5);
    }

    #[test]
    fn test_weak_pass_decays_count() {
        let settings = PersistenceSettings::default();
        let mut tracker = GcdPersistenceTracker::new();

        tracker.update(&fit(2.0, 1.0), None, &settings);
        tracker.update(&fit(2.0, 1.0), None, &settings);
        assert_eq!(tracker.update(&fit(2.0, 0.5), None, &settings).persist_count, 1);
        assert_eq!(tracker.update(&fit(2.0, 0.5), None, &settings).persist_count, 0);
        assert_eq!(tracker.update(&fit(2.0, 0.5), None, &settings).persist_count, 0);
    }

    #[test]
    fn test_idle_step_suppresses_verdict() {
        let settings = PersistenceSettings::default();
        let mut tracker = GcdPersistenceTracker::new();
        let baseline = Baseline {
            gcd_yaw_step: 2.002,
            gcd_yaw_coverage: 1.0,
            ..Baseline::default()
        };

        let mut verdict = PersistenceVerdict::default();
        for _ in 0..5 {
            verdict = tracker.update(&fit(2.0, 1.0), Some(&baseline), &settings);
        }
        assert_eq!(verdict.persist_count, 5);
        assert!(verdict.baseline_same);
        assert!(!verdict.persistent);
    }

    #[test]
    fn test_unmeasured_baseline_is_ignored() {
        let settings = PersistenceSettings::default();
        let mut tracker = GcdPersistenceTracker::new();
        let baseline = Baseline::default();

        let mut verdict = PersistenceVerdict::default();
        for _ in 0..3 {
            verdict = tracker.update(&fit(0.01, 1.0), Some(&baseline), &settings);
        }
        assert!(!verdict.baseline_same);
        assert!(verdict.persistent);
    }
}
