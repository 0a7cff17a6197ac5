//! Per-subject detector state

use serde::Serialize;

use super::evidence::{Evidence, EvidenceSummary, Flag, HeuristicEvidence, SequenceEvidence};
use super::registry::{ROTATION_ANOMALY, ROTATION_HEURISTICS, SNAP_SEQUENCE};
use super::resolver::{BearingQuery, TargetResolver};
use crate::analysis::scoring::score_pass;
use crate::analysis::sequence::{candidate_runs, evaluate_run};
use crate::analysis::{
    AimConvergenceWindow, AttackHistory, Baseline, BaselineProfiler, CombatState, EvidenceGroups, GcdPersistenceTracker,
    HeuristicProfile, PassInput, ScoringEngine, SnapSequenceTracker,
};
use crate::config::Settings;
use crate::features::Feature;
use crate::rotation::{Bearing, RotationSample, SampleBuffer, Timestamp};
use crate::{SubjectId, TargetId};

/// Diagnostic view of one subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSnapshot {
    pub subject: SubjectId,
    pub score: f64,
    pub samples: usize,
    pub attacks: usize,
    pub last_attack: Option<Timestamp>,
    pub last_flag: Option<Timestamp>,
    pub flags: u32,
    pub analysis_passes: u64,
    /// Evidence groups of the most recent analysis pass
    pub last_groups: Option<EvidenceGroups>,
    pub baseline: Option<Baseline>,
    pub persist_count: u32,
    pub stable_step: f64,
    pub convergence_target: Option<TargetId>,
    /// An attack awaits snap sequence analysis
    pub sequence_pending: bool,
    pub last_sequence_flag: Option<Timestamp>,
    pub heuristic_anomalies: u32,
}

/// Everything the detector keeps for one subject
pub(crate) struct SubjectState {
    id: SubjectId,
    buffer: SampleBuffer,
    attacks: AttackHistory,
    scoring: ScoringEngine,
    persistence: GcdPersistenceTracker,
    profiler: BaselineProfiler,
    aim_window: Option<AimConvergenceWindow>,
    last_analysis: Option<Timestamp>,
    analysis_passes: u64,
    last_groups: Option<EvidenceGroups>,
    sequence: SnapSequenceTracker,
    heuristics: HeuristicProfile,
    /// Set when the subject leaves; in-flight events then do nothing
    pub(crate) removed: bool,
}

impl SubjectState {
    pub fn new(id: SubjectId, settings: &Settings) -> Self {
        Self {
            id,
            buffer: SampleBuffer::from_settings(&settings.buffer),
            attacks: AttackHistory::new(),
            scoring: ScoringEngine::new(),
            persistence: GcdPersistenceTracker::new(),
            profiler: BaselineProfiler::new(),
            aim_window: None,
            last_analysis: None,
            analysis_passes: 0,
            last_groups: None,
            sequence: SnapSequenceTracker::new(),
            heuristics: HeuristicProfile::new(),
            removed: false,
        }
    }

    /// Feed one rotation to every enabled detector. At most one flag comes
    /// out per event; detectors after the flagging one keep their work for
    /// a later event.
    pub fn on_rotation(
        &mut self,
        sample: RotationSample,
        settings: &Settings,
        resolver: &dyn TargetResolver,
    ) -> Option<Flag> {
        let now = sample.timestamp;
        self.scoring.decay(now, &settings.scoring);
        let anomaly = settings.is_detector_enabled(ROTATION_ANOMALY);

        let mut flag = None;
        if !sample.is_degenerate(settings.buffer.min_delta) {
            self.buffer.push(sample);
            self.profiler
                .maybe_update(now, self.attacks.last(), &self.buffer, settings);

            if anomaly && self.scoring.state(now, self.attacks.last(), &settings.scoring) == CombatState::InCombat {
                flag = self.analyze(now, settings);
            }
        }
        if anomaly {
            self.sample_aim(now, sample.yaw_after, sample.pitch_after, settings, resolver);
        }

        if flag.is_none() && settings.is_detector_enabled(SNAP_SEQUENCE) {
            flag = self.snap_sequence(now, settings.sequence.analyze_after_ms, settings, resolver);
        }
        if settings.is_detector_enabled(ROTATION_HEURISTICS) {
            self.heuristics.record(sample, &settings.heuristics);
            if flag.is_none() {
                flag = self.heuristic_pass(now, settings);
            }
        }
        flag
    }

    pub fn on_attack(&mut self, now: Timestamp, target: TargetId, settings: &Settings) {
        self.scoring.decay(now, &settings.scoring);
        self.attacks.record(now);

        if settings.is_detector_enabled(ROTATION_ANOMALY) {
            if let Some(old) = self.aim_window.take() {
                log::trace!("{}: convergence window for {} replaced", self.id, old.target());
            }
            self.aim_window = Some(AimConvergenceWindow::open(target, now));
            log::trace!("{}: convergence window opened for {}", self.id, target);
        }
        if settings.is_detector_enabled(SNAP_SEQUENCE) {
            self.sequence.on_attack(now, target);
        }
        if settings.is_detector_enabled(ROTATION_HEURISTICS) {
            self.heuristics.on_attack(now, &settings.heuristics);
        }
    }

    /// Idle upkeep; also runs a snap sequence analysis that no rotation
    /// arrived to trigger
    pub fn on_tick(&mut self, now: Timestamp, settings: &Settings, resolver: &dyn TargetResolver) -> Option<Flag> {
        self.scoring.decay(now, &settings.scoring);
        self.buffer.prune(now);
        if self
            .aim_window
            .as_ref()
            .is_some_and(|w| w.is_expired(now, &settings.convergence))
        {
            self.close_aim_window("expired");
        }

        if settings.is_detector_enabled(SNAP_SEQUENCE) {
            return self.snap_sequence(now, settings.sequence.tick_analyze_after_ms, settings, resolver);
        }
        None
    }

    pub fn snapshot(&self) -> SubjectSnapshot {
        SubjectSnapshot {
            subject: self.id,
            score: self.scoring.score(),
            samples: self.buffer.len(),
            attacks: self.attacks.len(),
            last_attack: self.attacks.last(),
            last_flag: self.scoring.last_flag(),
            flags: self.scoring.flags(),
            analysis_passes: self.analysis_passes,
            last_groups: self.last_groups,
            baseline: self.profiler.baseline().copied(),
            persist_count: self.persistence.persist_count(),
            stable_step: self.persistence.last_stable_step(),
            convergence_target: self.aim_window.as_ref().map(AimConvergenceWindow::target),
            sequence_pending: self.sequence.is_pending(),
            last_sequence_flag: self.sequence.last_flag(),
            heuristic_anomalies: self.heuristics.anomalies(),
        }
    }

    /// One rate-limited analysis pass while in combat
    fn analyze(&mut self, now: Timestamp, settings: &Settings) -> Option<Flag> {
        let sc = &settings.scoring;
        if self
            .last_analysis
            .is_some_and(|t| now.saturating_sub(t) < sc.analysis_interval_ms)
        {
            return None;
        }
        self.last_analysis = Some(now);

        let window = self.buffer.recent(sc.analysis_window);
        if window.len() < sc.min_samples {
            return None;
        }
        let significant: Vec<RotationSample> = window
            .into_iter()
            .filter(|s| s.magnitude() >= sc.significant_delta)
            .collect();
        if significant.len() < sc.min_significant_samples {
            return None;
        }

        let feature = Feature::compute(&significant, settings);
        let baseline = self.profiler.baseline().copied();
        let persistence = self
            .persistence
            .update(&feature.quant_best, baseline.as_ref(), &settings.persistence);
        let convergence = self
            .aim_window
            .as_mut()
            .and_then(|w| w.evaluate(&settings.convergence));

        let input = PassInput {
            feature: &feature,
            persistence,
            baseline: baseline.as_ref(),
            convergence_positive: convergence.is_some_and(|c| c.positive),
            convergence_gain: settings.convergence.gain,
            cadence: self.attacks.cadence(&sc.cadence),
        };
        let pass = score_pass(&input, sc);
        self.scoring.apply(&pass, sc);
        self.analysis_passes += 1;
        self.last_groups = Some(pass.groups);

        log::debug!(
            "{}: pass A={} B={} C={} gcd={} +{:.2} score={:.2}",
            self.id,
            pass.groups.periodic,
            pass.groups.mechanical,
            pass.groups.convergence,
            pass.persistent_gcd,
            pass.total(),
            self.scoring.score()
        );

        let recent = self.attacks.count_within(now, sc.recent_attack_window_ms);
        let score = self.scoring.try_flag(now, recent, sc)?;
        let evidence = EvidenceSummary::new(score, &feature, &pass, convergence, recent);
        log::info!("{}: flagged by {} ({})", self.id, ROTATION_ANOMALY, evidence);

        Some(Flag {
            subject: self.id,
            detector: ROTATION_ANOMALY,
            score,
            evidence: Evidence::RotationAnomaly(evidence),
            timestamp: now,
        })
    }

    /// Examine the rotations around the last attack once it is `delay_ms` old
    fn snap_sequence(
        &mut self,
        now: Timestamp,
        delay_ms: u64,
        settings: &Settings,
        resolver: &dyn TargetResolver,
    ) -> Option<Flag> {
        let ss = &settings.sequence;
        let (attack, target) = self.sequence.take_due(now, delay_ms)?;
        if self.sequence.in_cooldown(now, ss) {
            return None;
        }

        let targets: Vec<Bearing> = ss
            .reference_height_fractions
            .iter()
            .filter_map(|&fraction| {
                resolver.resolve_live_bearing(BearingQuery {
                    subject: self.id,
                    target,
                    reference_height_fraction: fraction,
                })
            })
            .collect();
        if targets.is_empty() {
            log::trace!("{}: no bearing for {}, sequence skipped", self.id, target);
            return None;
        }

        let window = self
            .buffer
            .between(attack.saturating_sub(ss.pre_window_ms), attack + ss.post_window_ms);
        let verdict = candidate_runs(&window, ss)
            .into_iter()
            .filter_map(|run| evaluate_run(run, attack, &targets, ss))
            .min_by(|a, b| a.end_yaw_error.total_cmp(&b.end_yaw_error))?;

        self.sequence.mark_flagged(now);
        let score = (1.0 - verdict.end_yaw_error / ss.end_yaw_error).clamp(0.0, 1.0);
        let evidence = SequenceEvidence { target, attack, verdict };
        log::info!("{}: flagged by {} ({})", self.id, SNAP_SEQUENCE, evidence);

        Some(Flag {
            subject: self.id,
            detector: SNAP_SEQUENCE,
            score,
            evidence: Evidence::SnapSequence(evidence),
            timestamp: now,
        })
    }

    fn heuristic_pass(&mut self, now: Timestamp, settings: &Settings) -> Option<Flag> {
        let hs = &settings.heuristics;
        let attacks = self.attacks.recent(hs.attack_history);
        let verdict = self.heuristics.analyze(now, &attacks, hs)?;
        let evidence = HeuristicEvidence::from(verdict);
        log::info!("{}: flagged by {} ({})", self.id, ROTATION_HEURISTICS, evidence);

        Some(Flag {
            subject: self.id,
            detector: ROTATION_HEURISTICS,
            score: verdict.scores.combined,
            evidence: Evidence::Heuristics(evidence),
            timestamp: now,
        })
    }

    /// Record the aim error against the attacked target, if a window is open
    fn sample_aim(
        &mut self,
        now: Timestamp,
        yaw: f64,
        pitch: f64,
        settings: &Settings,
        resolver: &dyn TargetResolver,
    ) {
        let cs = &settings.convergence;
        let Some(window) = self.aim_window.as_mut() else {
            return;
        };
        if window.is_expired(now, cs) {
            self.close_aim_window("expired");
            return;
        }
        if window.is_evaluated() {
            return;
        }

        let query = BearingQuery {
            subject: self.id,
            target: window.target(),
            reference_height_fraction: cs.reference_height_fraction,
        };
        match resolver.resolve_live_bearing(query) {
            Some(bearing) => window.record(now, bearing.error_to(yaw, pitch), cs),
            None => self.close_aim_window("target lost"),
        }
    }

    fn close_aim_window(&mut self, reason: &str) {
        if let Some(w) = self.aim_window.take() {
            log::trace!("{}: convergence window for {} closed ({})", self.id, w.target(), reason);
        }
    }
}
