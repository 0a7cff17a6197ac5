//! Long-window heuristic anomaly counter
//!
//! Every few seconds the subject's recent rotation history is scored by the
//! distribution heuristics. Analyses above the anomaly threshold accumulate;
//! enough of them, or fewer during a long attack streak, produce a flag.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::config::HeuristicSettings;
use crate::features::distribution;
use crate::rotation::{RotationSample, Timestamp};

/// Per-heuristic scores of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HeuristicScores {
    pub entropy: f64,
    pub machine_precision: f64,
    pub temporal: f64,
    pub pattern_consistency: f64,
    pub snap_accuracy: f64,
    pub distribution: f64,
    /// Weighted combination of the above
    pub combined: f64,
}

impl HeuristicScores {
    fn weighted(mut self, settings: &HeuristicSettings) -> Self {
        let w = &settings.weights;
        self.combined = self.entropy * w.entropy
            + self.machine_precision * w.machine_precision
            + self.temporal * w.temporal
            + self.pattern_consistency * w.pattern_consistency
            + self.snap_accuracy * w.snap_accuracy
            + self.distribution * w.distribution;
        self
    }
}

/// Outcome of an analysis that crossed the flag requirement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicVerdict {
    pub scores: HeuristicScores,
    pub anomalies: u32,
    pub streak: u32,
}

/// Per-subject rotation history and anomaly counter
#[derive(Debug, Clone, Default)]
pub struct HeuristicProfile {
    frames: VecDeque<RotationSample>,
    magnitudes: VecDeque<f64>,
    histogram: HashMap<i64, u32>,
    last_analysis: Option<Timestamp>,
    last_attack: Option<Timestamp>,
    anomalies: u32,
    streak: u32,
}

impl HeuristicProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anomalies(&self) -> u32 {
        self.anomalies
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn frames(&self) -> usize {
        self.frames.len()
    }

    /// Remember one rotation, degenerate ones included
    pub fn record(&mut self, sample: RotationSample, settings: &HeuristicSettings) {
        self.frames.push_back(sample);
        while self.frames.len() > settings.max_frames {
            self.frames.pop_front();
        }

        let magnitude = sample.magnitude();
        self.magnitudes.push_back(magnitude);
        while self.magnitudes.len() > settings.distribution_size {
            self.magnitudes.pop_front();
        }
        *self.histogram.entry(distribution::angle_key(magnitude)).or_insert(0) += 1;
    }

    /// Track attack streaks: attacks closer than `streak_gap_ms` extend one
    pub fn on_attack(&mut self, now: Timestamp, settings: &HeuristicSettings) {
        let chained = self
            .last_attack
            .is_some_and(|t| now.saturating_sub(t) < settings.streak_gap_ms);
        self.streak = if chained { self.streak + 1 } else { 1 };
        self.last_attack = Some(now);
    }

    pub fn is_due(&self, now: Timestamp, settings: &HeuristicSettings) -> bool {
        self.frames.len() > settings.min_frames
            && !self
                .last_analysis
                .is_some_and(|t| now.saturating_sub(t) <= settings.analysis_interval_ms)
    }

    /// Score the history if an analysis is due. `attacks` are the subject's
    /// recent attack times in order.
    ///
    /// Returns a verdict when this analysis completes the flag requirement.
    pub fn analyze(
        &mut self,
        now: Timestamp,
        attacks: &[Timestamp],
        settings: &HeuristicSettings,
    ) -> Option<HeuristicVerdict> {
        if !self.is_due(now, settings) {
            return None;
        }
        self.last_analysis = Some(now);

        let scores = self.score(attacks, settings);
        log::debug!(
            "heuristics: ent={:.2} mach={:.2} temp={:.2} pat={:.2} snap={:.2} dist={:.2} => {:.2}",
            scores.entropy,
            scores.machine_precision,
            scores.temporal,
            scores.pattern_consistency,
            scores.snap_accuracy,
            scores.distribution,
            scores.combined
        );

        if scores.combined > settings.anomaly_threshold {
            self.anomalies += 1;
            if self.flag_due(settings) {
                let verdict = HeuristicVerdict {
                    scores,
                    anomalies: self.anomalies,
                    streak: self.streak,
                };
                self.anomalies = self.anomalies.saturating_sub(settings.flag_rebate);
                self.streak = 0;
                self.histogram.clear();
                return Some(verdict);
            }
        } else if scores.combined < settings.calm_threshold {
            self.anomalies = self.anomalies.saturating_sub(1);
            self.streak = self.streak.saturating_sub(1);
        }
        None
    }

    fn flag_due(&self, settings: &HeuristicSettings) -> bool {
        self.anomalies >= settings.min_anomalies
            || (self.anomalies >= settings.min_anomalies_with_streak && self.streak > settings.streak_hits)
    }

    fn score(&self, attacks: &[Timestamp], settings: &HeuristicSettings) -> HeuristicScores {
        let frames: Vec<RotationSample> = self.frames.iter().copied().collect();
        let magnitudes: Vec<f64> = self.magnitudes.iter().copied().collect();
        let attacks = &attacks[attacks.len().saturating_sub(settings.attack_history)..];

        HeuristicScores {
            entropy: distribution::entropy_score(&self.histogram, settings.entropy_threshold),
            machine_precision: distribution::machine_precision_score(&frames),
            temporal: distribution::temporal_anomaly_score(attacks),
            pattern_consistency: distribution::pattern_consistency_score(&frames),
            snap_accuracy: distribution::snap_accuracy_score(&frames, attacks),
            distribution: distribution::distribution_anomaly_score(&magnitudes),
            combined: 0.0,
        }
        .weighted(settings)
    }
}
