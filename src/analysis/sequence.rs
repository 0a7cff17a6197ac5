//! Pre-attack snap sequences
//!
//! Aim assistance often turns onto a target in a short run of near-equal,
//! quantized yaw steps that ends exactly on the target just before the hit,
//! with a slightly smaller final step. Each attack is examined once, shortly
//! after it lands, over the rotations around it.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::SequenceSettings;
use crate::rotation::{wrap_degrees, Bearing, RotationSample, Timestamp};
use crate::TargetId;

/// Largest common step of a set of yaw steps and how many steps it explains
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StepGcd {
    pub step: f64,
    pub coverage: f64,
    /// Every step is a multiple of `step`
    pub all_quantized: bool,
}

/// Measurements of a sequence that passed the strict or balanced profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SequenceVerdict {
    pub steps: usize,
    pub uniformity: f64,
    pub cv: f64,
    pub mean_step: f64,
    pub last_step: f64,
    pub gcd: StepGcd,
    pub initial_error: f64,
    pub end_yaw_error: f64,
    pub end_pitch_error: f64,
    /// Passed the strict profile, not only the balanced one
    pub strict: bool,
}

/// Euclid's algorithm on floats, treating remainders within `eps` of 0 or
/// of the divisor as exact
fn float_gcd(a: f64, b: f64, eps: f64) -> f64 {
    let (mut a, mut b) = (a.abs().max(b.abs()), a.abs().min(b.abs()));
    if b < eps {
        return a;
    }
    for _ in 0..18 {
        let r = a % b;
        if r < eps || (b - r).abs() < eps {
            return b;
        }
        a = b;
        b = r;
    }
    b
}

/// Estimate the common step of absolute yaw steps.
///
/// Candidates come from pairwise GCDs of the leading steps (up to four,
/// excluding the final one), rounded to 0.001 degrees. The candidate
/// explaining the most steps wins, larger steps on ties.
pub fn step_gcd(steps: &[f64], settings: &SequenceSettings) -> StepGcd {
    let usable = |v: &&f64| **v >= settings.min_step;
    let lead = steps.len().saturating_sub(1).min(4);
    let mut sample: Vec<f64> = steps[..lead].iter().filter(usable).copied().collect();
    if sample.len() < 2 {
        sample.extend(steps.iter().filter(usable));
    }
    if sample.len() < 2 {
        return StepGcd::default();
    }

    let mut candidates = BTreeSet::new();
    for (i, &a) in sample.iter().enumerate() {
        for &b in &sample[i + 1..] {
            let g = float_gcd(a, b, settings.gcd_epsilon);
            if g >= settings.gcd_min {
                candidates.insert((g * 1000.0).round() as i64);
            }
        }
    }

    let mut best = StepGcd::default();
    for key in candidates {
        let g = key as f64 / 1000.0;
        let mut total = 0;
        let mut hits = 0;
        for &v in steps.iter().filter(|v| **v >= settings.min_step) {
            total += 1;
            let q = (v - (v / g).round() * g).abs();
            if q <= settings.gcd_epsilon || (g - q).abs() <= settings.gcd_epsilon {
                hits += 1;
            }
        }
        if total == 0 {
            continue;
        }
        let coverage = f64::from(hits) / f64::from(total);
        if coverage > best.coverage || ((coverage - best.coverage).abs() <= 1e-6 && g > best.step) {
            best = StepGcd {
                step: g,
                coverage,
                all_quantized: hits == total,
            };
        }
    }
    best
}

/// Runs of consecutive same-signed yaw steps at tick spacing, at least
/// `min_steps` long
pub fn candidate_runs<'a>(window: &'a [RotationSample], settings: &SequenceSettings) -> Vec<&'a [RotationSample]> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut len = 0;
    let mut sign = 0.0;

    for (i, s) in window.iter().enumerate() {
        let dt = if i == 0 { 50 } else { s.timestamp.saturating_sub(window[i - 1].timestamp) };
        let tick_ok = (settings.min_tick_ms..=settings.max_tick_ms).contains(&dt);
        let big = s.yaw_delta.abs() >= settings.min_step;
        let sgn = s.yaw_delta.signum();

        if big && tick_ok && s.yaw_delta != 0.0 {
            if len > 0 && sgn == sign {
                len += 1;
                continue;
            }
            if len >= settings.min_steps {
                runs.push(&window[start..start + len]);
            }
            start = i;
            len = 1;
            sign = sgn;
        } else {
            if len >= settings.min_steps {
                runs.push(&window[start..start + len]);
            }
            len = 0;
        }
    }
    if len >= settings.min_steps {
        runs.push(&window[start..start + len]);
    }
    runs
}

/// Judge one run against the attack it precedes and the target's reference
/// bearings. `None` when any gate fails.
pub fn evaluate_run(
    run: &[RotationSample],
    attack: Timestamp,
    targets: &[Bearing],
    settings: &SequenceSettings,
) -> Option<SequenceVerdict> {
    let n = run.len();
    if n < settings.min_steps || n > settings.max_steps {
        return None;
    }
    let (first, last) = (run.first()?, run.last()?);

    let spacing_ok = run
        .windows(2)
        .map(|w| w[1].timestamp.saturating_sub(w[0].timestamp))
        .all(|dt| (settings.min_tick_ms..=settings.max_tick_ms).contains(&dt));
    if !spacing_ok {
        return None;
    }
    if attack.saturating_sub(last.timestamp) > settings.near_attack_ms {
        return None;
    }

    let initial_error = targets
        .iter()
        .map(|t| wrap_degrees(first.yaw_before - t.yaw).abs())
        .fold(f64::INFINITY, f64::min);
    if initial_error < settings.min_initial_error {
        return None;
    }

    // Pitch error is taken from the bearing with the best yaw error.
    let (end_yaw_error, end_pitch_error) = targets
        .iter()
        .map(|t| {
            (
                wrap_degrees(last.yaw_after - t.yaw).abs(),
                (last.pitch_after - t.pitch).abs(),
            )
        })
        .fold((f64::INFINITY, f64::INFINITY), |best, e| if e.0 < best.0 { e } else { best });
    if end_yaw_error > settings.end_yaw_error || end_pitch_error > settings.end_pitch_error {
        return None;
    }

    let steps: Vec<f64> = run.iter().map(|s| s.yaw_delta.abs()).collect();
    if steps.iter().sum::<f64>() / (n as f64) < settings.min_mean_step {
        return None;
    }

    // Uniformity over all but the final correcting step
    let main = &steps[..(n - 1).max(1)];
    let max = main.iter().copied().fold(0.0, f64::max);
    let min = main.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = main.iter().sum::<f64>() / main.len() as f64;
    let var = (main.iter().map(|v| v * v).sum::<f64>() / main.len() as f64 - mean * mean).max(0.0);
    let uniformity = (max - min) / max.max(1e-6);
    let cv = if mean > 1e-6 { var.sqrt() / mean } else { 1.0 };

    let gcd = step_gcd(&steps, settings);
    let gcd_strict = gcd.step >= settings.gcd_min && gcd.all_quantized;
    let gcd_balanced = gcd.step >= settings.gcd_min && gcd.coverage >= settings.gcd_coverage_balanced;

    let last_step = steps[n - 1];
    let strict = uniformity <= settings.uniformity_strict
        && gcd_strict
        && last_step <= mean * settings.last_step_ratio_strict;
    let balanced = (uniformity <= settings.uniformity_balanced || cv <= settings.cv_balanced)
        && gcd_balanced
        && last_step <= mean * settings.last_step_ratio_balanced;
    if !(strict || balanced) {
        return None;
    }

    Some(SequenceVerdict {
        steps: n,
        uniformity,
        cv,
        mean_step: mean,
        last_step,
        gcd,
        initial_error,
        end_yaw_error,
        end_pitch_error,
        strict,
    })
}

/// Per-subject bookkeeping of which attack awaits analysis
#[derive(Debug, Clone, Default)]
pub struct SnapSequenceTracker {
    attack: Option<(Timestamp, TargetId)>,
    pending: bool,
    last_analyzed: Option<Timestamp>,
    last_flag: Option<Timestamp>,
}

impl SnapSequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_attack(&mut self, now: Timestamp, target: TargetId) {
        self.attack = Some((now, target));
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn last_flag(&self) -> Option<Timestamp> {
        self.last_flag
    }

    /// The attack to analyze if at least `delay_ms` has passed since it
    pub fn take_due(&mut self, now: Timestamp, delay_ms: u64) -> Option<(Timestamp, TargetId)> {
        let (at, target) = self.attack?;
        if !self.pending || now.saturating_sub(at) < delay_ms || self.last_analyzed == Some(at) {
            return None;
        }
        self.pending = false;
        self.last_analyzed = Some(at);
        Some((at, target))
    }

    pub fn in_cooldown(&self, now: Timestamp, settings: &SequenceSettings) -> bool {
        self.last_flag
            .is_some_and(|t| now.saturating_sub(t) < settings.cooldown_ms)
    }

    pub fn mark_flagged(&mut self, now: Timestamp) {
        self.last_flag = Some(now);
    }
}
