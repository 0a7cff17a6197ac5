//! Suspicion scoring
//!
//! Turns many weak, individually noisy signals into a bounded score that
//! decays over time, and gates flag emission behind a threshold, a minimum
//! number of recent attacks, and a per-subject cooldown.

use serde::Serialize;

use crate::analysis::baseline::Baseline;
use crate::analysis::cadence::CadenceStats;
use crate::analysis::persistence::PersistenceVerdict;
use crate::config::{EvidenceThresholds, ScoringSettings};
use crate::features::Feature;
use crate::rotation::Timestamp;

/// Per-subject combat state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CombatState {
    /// No recent attack; score only decays
    Idle,
    /// Attacked within the activity window; analysis runs
    InCombat,
    /// A flag was emitted at this instant
    Flagged,
}

/// Which of the three evidence groups hold for a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EvidenceGroups {
    /// A: oscillation, curvature, spectral or autocorrelation evidence
    pub periodic: bool,
    /// B: uniform speed, robotic, linear, no micro-corrections or low jerk
    pub mechanical: bool,
    /// C: positive snap convergence this episode
    pub convergence: bool,
}

impl EvidenceGroups {
    pub fn classify(f: &Feature, th: &EvidenceThresholds, convergence: bool) -> Self {
        let periodic = f.oscillation >= th.oscillation
            || f.circularity >= th.circularity
            || f.spectral_peak >= th.spectral_peak
            || f.autocorrelation >= th.autocorrelation;

        let mechanical = (f.const_speed.ratio >= th.const_speed
            && f.const_speed.samples >= th.const_speed_min_samples)
            || (f.robotic.samples >= th.robotic_min_samples
                && f.robotic.std_dev <= th.robotic_std_max
                && f.robotic.mean >= th.robotic_mean_min)
            || f.linearity >= th.linearity
            || f.lacks_micro
            || f.jerk_zero_share >= th.jerk_zero_share;

        Self {
            periodic,
            mechanical,
            convergence,
        }
    }

    pub fn count(&self) -> usize {
        [self.periodic, self.mechanical, self.convergence]
            .iter()
            .filter(|g| **g)
            .count()
    }
}

/// Everything one analysis pass contributes to the score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PassScore {
    pub groups: EvidenceGroups,
    pub persistent_gcd: bool,
    /// Group combination increment
    pub frame: f64,
    /// Deviation from the subject's own idle profile
    pub baseline: f64,
    pub cadence: f64,
    pub convergence: f64,
}

impl PassScore {
    pub fn total(&self) -> f64 {
        self.frame + self.baseline + self.cadence + self.convergence
    }
}

/// Inputs of one analysis pass
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    pub feature: &'a Feature,
    pub persistence: PersistenceVerdict,
    pub baseline: Option<&'a Baseline>,
    pub convergence_positive: bool,
    pub convergence_gain: f64,
    pub cadence: CadenceStats,
}

/// Combine pass inputs into score increments. Pure.
pub fn score_pass(input: &PassInput<'_>, settings: &ScoringSettings) -> PassScore {
    let f = input.feature;
    let th = &settings.thresholds;
    let groups = EvidenceGroups::classify(f, th, input.convergence_positive);
    let persistent = input.persistence.persistent;

    let mut frame = 0.0;
    if groups.count() >= 2 {
        frame += settings.base_increment;
        if groups.periodic && groups.mechanical {
            frame += settings.both_ab_bonus;
        }
        if groups.convergence {
            frame += settings.convergence_bonus;
        }
        if persistent {
            frame += settings.persistent_gcd_bonus;
        }
    } else if groups.convergence && persistent {
        frame += settings.weak_corroboration_increment;
    }

    let mut baseline = 0.0;
    if let Some(b) = input.baseline {
        if f.lacks_micro && b.micro_ratio().is_some_and(|m| m > settings.baseline_micro_min) {
            baseline += settings.baseline_micro_bonus;
        }
        if f.jerk_zero_share >= th.jerk_zero_share
            && b.jerk_share().is_some_and(|j| j < settings.baseline_jerk_max)
        {
            baseline += settings.baseline_jerk_bonus;
        }
        if persistent
            && b
                .step_for(f.quant_best.axis)
                .is_some_and(|idle| (f.quant_best.step - idle).abs() > settings.baseline_step_delta)
        {
            baseline += settings.baseline_step_bonus;
        }
    }

    let cadence = if settings.cadence.enabled && input.cadence.regular && frame > 0.0 {
        settings.cadence.bonus
    } else {
        0.0
    };

    PassScore {
        groups,
        persistent_gcd: persistent,
        frame,
        baseline,
        cadence,
        convergence: if groups.convergence { input.convergence_gain } else { 0.0 },
    }
}

/// Per-subject score state machine
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    score: f64,
    last_decay: Option<Timestamp>,
    last_flag: Option<Timestamp>,
    flags: u32,
}

impl ScoringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn last_flag(&self) -> Option<Timestamp> {
        self.last_flag
    }

    /// Flags emitted since creation or the last reset
    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn state(&self, now: Timestamp, last_attack: Option<Timestamp>, settings: &ScoringSettings) -> CombatState {
        if self.last_flag == Some(now) {
            CombatState::Flagged
        } else if last_attack.is_some_and(|t| now.saturating_sub(t) <= settings.attack_window_ms) {
            CombatState::InCombat
        } else {
            CombatState::Idle
        }
    }

    /// Time-based decay up to `now`. Never increases the score.
    pub fn decay(&mut self, now: Timestamp, settings: &ScoringSettings) {
        let Some(last) = self.last_decay else {
            self.last_decay = Some(now);
            return;
        };
        if now <= last {
            return;
        }
        let elapsed = (now - last) as f64 / 1000.0;
        self.score = (self.score - settings.decay_per_second * elapsed).max(0.0);
        self.last_decay = Some(now);
    }

    /// Add a pass's increments, clamped to the maximum
    pub fn apply(&mut self, pass: &PassScore, settings: &ScoringSettings) {
        let add = pass.total();
        if add > 0.0 {
            self.score = (self.score + add).min(settings.clamp_max);
        }
    }

    /// Emit a flag if every gate passes. Returns the score at flag time.
    pub fn try_flag(&mut self, now: Timestamp, recent_attacks: usize, settings: &ScoringSettings) -> Option<f64> {
        if self.score < settings.flag_threshold || recent_attacks < settings.min_recent_attacks {
            return None;
        }
        if self
            .last_flag
            .is_some_and(|t| now.saturating_sub(t) < settings.cooldown_ms)
        {
            return None;
        }

        let flagged = self.score;
        self.score = (self.score - settings.flag_rebate).max(0.0);
        self.last_flag = Some(now);
        self.flags += 1;
        Some(flagged)
    }
}
