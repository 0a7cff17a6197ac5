//! Idle baseline profiler
//!
//! Keeps an exponentially weighted profile of how a subject rotates when not
//! fighting, so combat windows can be compared against the subject's own
//! normal rather than a global one.

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::features::Feature;
use crate::rotation::{Axis, SampleBuffer, Timestamp};

/// A subject's idle-state profile. Fields stay 0 until measured.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub gcd_yaw_step: f64,
    pub gcd_yaw_coverage: f64,
    pub gcd_pitch_step: f64,
    pub gcd_pitch_coverage: f64,
    pub micro_correction_ratio: f64,
    pub jerk_zero_share: f64,
}

impl Baseline {
    /// Idle quantization step for an axis, `None` if never measured
    pub fn step_for(&self, axis: Axis) -> Option<f64> {
        let step = match axis {
            Axis::Yaw => self.gcd_yaw_step,
            Axis::Pitch => self.gcd_pitch_step,
        };
        (step > 0.0).then_some(step)
    }

    /// Idle micro-correction ratio, `None` if never measured
    pub fn micro_ratio(&self) -> Option<f64> {
        (self.micro_correction_ratio > 0.0).then_some(self.micro_correction_ratio)
    }

    /// Idle jerk-zero share, `None` if never measured
    pub fn jerk_share(&self) -> Option<f64> {
        (self.jerk_zero_share > 0.0).then_some(self.jerk_zero_share)
    }
}

/// EMA with a separate weight for the first (zero-valued) observation
fn ema(prev: f64, value: f64, alpha: f64, cold_start_alpha: f64) -> f64 {
    blend(prev, value, if prev == 0.0 { cold_start_alpha } else { alpha })
}

fn blend(prev: f64, value: f64, weight: f64) -> f64 {
    prev * (1.0 - weight) + value * weight
}

/// Per-subject baseline maintenance
#[derive(Debug, Clone, Default)]
pub struct BaselineProfiler {
    baseline: Option<Baseline>,
    last_attempt: Option<Timestamp>,
    updates: u32,
}

impl BaselineProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Successful updates so far
    pub fn updates(&self) -> u32 {
        self.updates
    }

    /// Update the profile if the subject is idle and the rate limit allows.
    ///
    /// Returns `true` when the baseline changed.
    pub fn maybe_update(
        &mut self,
        now: Timestamp,
        last_attack: Option<Timestamp>,
        buffer: &SampleBuffer,
        settings: &Settings,
    ) -> bool {
        let bs = &settings.baseline;
        if last_attack.is_some_and(|t| now.saturating_sub(t) < bs.idle_after_attack_ms) {
            return false;
        }
        if self
            .last_attempt
            .is_some_and(|t| now.saturating_sub(t) < bs.min_update_interval_ms)
        {
            return false;
        }
        self.last_attempt = Some(now);

        let window = buffer.recent(bs.window);
        if window.len() < bs.min_window_samples {
            return false;
        }
        let significant: Vec<_> = window
            .into_iter()
            .filter(|s| s.magnitude() >= settings.scoring.significant_delta)
            .collect();
        if significant.len() < bs.min_significant_samples {
            return false;
        }

        let f = Feature::compute(&significant, settings);
        self.absorb(&f, bs.alpha, bs.cold_start_alpha);
        log::debug!(
            "baseline updated: micro={:.2} jerk0={:.2} yaw_step={:.3}",
            f.micro_ratio,
            f.jerk_zero_share,
            f.quant_yaw.step
        );
        true
    }

    fn absorb(&mut self, f: &Feature, alpha: f64, cold: f64) {
        let b = self.baseline.get_or_insert_with(Baseline::default);
        // A zero-step fit means too few deltas on that axis, not a measurement.
        // Coverage shares the cold-start decision of its step.
        if f.quant_yaw.step > 0.0 {
            let w = if b.gcd_yaw_step == 0.0 { cold } else { alpha };
            b.gcd_yaw_step = blend(b.gcd_yaw_step, f.quant_yaw.step, w);
            b.gcd_yaw_coverage = blend(b.gcd_yaw_coverage, f.quant_yaw.coverage, w);
        }
        if f.quant_pitch.step > 0.0 {
            let w = if b.gcd_pitch_step == 0.0 { cold } else { alpha };
            b.gcd_pitch_step = blend(b.gcd_pitch_step, f.quant_pitch.step, w);
            b.gcd_pitch_coverage = blend(b.gcd_pitch_coverage, f.quant_pitch.coverage, w);
        }
        b.micro_correction_ratio = ema(b.micro_correction_ratio, f.micro_ratio, alpha, cold);
        b.jerk_zero_share = ema(b.jerk_zero_share, f.jerk_zero_share, alpha, cold);
        self.updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::RotationSample;

    fn filled_buffer(count: u64, start: Timestamp) -> SampleBuffer {
        let mut buf = SampleBuffer::new(10_000, 64);
        for i in 0..count {
            let dy = if i % 3 == 0 { 6.3 + (i % 5) as f64 * 1.7 } else { 0.9 };
            let dp = if i % 2 == 0 { 0.4 } else { -0.35 };
            buf.push(RotationSample::from_rotation(start + i * 50, 0.0, dy, 0.0, dp));
        }
        buf
    }

    #[test]
    fn test_ema_cold_start_then_steady() {
        assert_eq!(ema(0.0, 0.5, 0.2, 1.0), 0.5);
        assert!((ema(0.5, 1.0, 0.2, 1.0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_update_when_idle() {
        let settings = Settings::default();
        let buf = filled_buffer(24, 0);
        let mut profiler = BaselineProfiler::new();

        assert!(profiler.maybe_update(1200, None, &buf, &settings));
        let b = profiler.baseline().unwrap();
        assert!(b.micro_correction_ratio > 0.5);
        assert!(b.micro_ratio().is_some());
    }

    #[test]
    fn test_no_update_in_combat() {
        let settings = Settings::default();
        let buf = filled_buffer(24, 0);
        let mut profiler = BaselineProfiler::new();

        assert!(!profiler.maybe_update(1200, Some(1000), &buf, &settings));
        assert!(profiler.baseline().is_none());
    }

    #[test]
    fn test_rate_limited() {
        let settings = Settings::default();
        let buf = filled_buffer(24, 0);
        let mut profiler = BaselineProfiler::new();

        assert!(profiler.maybe_update(1200, None, &buf, &settings));
        assert!(!profiler.maybe_update(1500, None, &buf, &settings));
        assert!(profiler.maybe_update(1800, None, &buf, &settings));
        assert_eq!(profiler.updates(), 2);
    }

    #[test]
    fn test_small_window_consumes_attempt() {
        let settings = Settings::default();
        let small = filled_buffer(10, 0);
        let mut profiler = BaselineProfiler::new();

        assert!(!profiler.maybe_update(600, None, &small, &settings));
        let full = filled_buffer(24, 0);
        assert!(!profiler.maybe_update(900, None, &full, &settings));
        assert!(profiler.baseline().is_none());
    }

    #[test]
    fn test_sparse_idle_window_keeps_measured_step() {
        let settings = Settings::default();
        let mut quantized = SampleBuffer::new(10_000, 64);
        for i in 0..24u64 {
            let dy = [2.0, -4.0, 6.0, -2.0, 4.0, -6.0][i as usize % 6];
            quantized.push(RotationSample::from_rotation(i * 50, 0.0, dy, 0.0, 0.0));
        }
        let mut profiler = BaselineProfiler::new();
        assert!(profiler.maybe_update(1200, None, &quantized, &settings));
        let before = profiler.baseline().unwrap().gcd_yaw_step;
        assert!((before - 2.0).abs() < 0.01);

        // Significant moves, but all below the quantization delta floor
        let mut sparse = SampleBuffer::new(10_000, 64);
        for i in 0..24u64 {
            let dy = 0.30 + (i % 10) as f64 * 0.01;
            sparse.push(RotationSample::from_rotation(i * 50, 0.0, dy, 0.0, 0.0));
        }
        for k in 1..=5 {
            assert!(profiler.maybe_update(1200 + k * 600, None, &sparse, &settings));
        }
        let b = profiler.baseline().unwrap();
        assert_eq!(b.gcd_yaw_step, before);
        assert!(b.gcd_yaw_coverage > 0.9);
        assert!(b.step_for(Axis::Pitch).is_none());
        assert_eq!(profiler.updates(), 6);
    }

    #[test]
    fn test_unmeasured_fields_are_none() {
        let b = Baseline::default();
        assert!(b.step_for(Axis::Yaw).is_none());
        assert!(b.micro_ratio().is_none());
        assert!(b.jerk_share().is_none());
    }
}
