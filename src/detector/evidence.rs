//! Flag records handed to the host

use serde::Serialize;

use crate::analysis::{ConvergenceResult, HeuristicScores, HeuristicVerdict, PassScore, SequenceVerdict};
use crate::features::{Feature, RotationPattern};
use crate::rotation::{Axis, Timestamp};
use crate::{SubjectId, TargetId};

/// Everything that went into one flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceSummary {
    pub score: f64,
    pub periodic: bool,
    pub mechanical: bool,
    pub convergence: bool,
    pub persistent_gcd: bool,
    pub gcd_axis: Axis,
    pub gcd_coverage: f64,
    pub gcd_step: f64,
    pub oscillation: f64,
    pub circularity: f64,
    pub const_speed: f64,
    pub robotic_mean: f64,
    pub robotic_std_dev: f64,
    pub linearity: f64,
    pub lacks_micro: bool,
    pub micro_ratio: f64,
    pub jerk_zero_share: f64,
    pub spectral_peak: f64,
    pub autocorrelation: f64,
    pub average_rotation: f64,
    pub recent_attacks: usize,
    pub cadence_regular: bool,
    pub convergence_result: Option<ConvergenceResult>,
    pub pattern: RotationPattern,
}

impl EvidenceSummary {
    pub(crate) fn new(
        score: f64,
        f: &Feature,
        pass: &PassScore,
        convergence: Option<ConvergenceResult>,
        recent_attacks: usize,
    ) -> Self {
        Self {
            score,
            periodic: pass.groups.periodic,
            mechanical: pass.groups.mechanical,
            convergence: pass.groups.convergence,
            persistent_gcd: pass.persistent_gcd,
            gcd_axis: f.quant_best.axis,
            gcd_coverage: f.quant_best.coverage,
            gcd_step: f.quant_best.step,
            oscillation: f.oscillation,
            circularity: f.circularity,
            const_speed: f.const_speed.ratio,
            robotic_mean: f.robotic.mean,
            robotic_std_dev: f.robotic.std_dev,
            linearity: f.linearity,
            lacks_micro: f.lacks_micro,
            micro_ratio: f.micro_ratio,
            jerk_zero_share: f.jerk_zero_share,
            spectral_peak: f.spectral_peak,
            autocorrelation: f.autocorrelation,
            average_rotation: f.mean_magnitude,
            recent_attacks,
            cadence_regular: pass.cadence > 0.0,
            convergence_result: convergence,
            pattern: f.pattern,
        }
    }
}

impl std::fmt::Display for EvidenceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "score={:.1} A={} B={} C={} gcd[{}: cov={:.2} step={:.3} persist={}] \
             osc={:.2} circ={:.2} const={:.2} robot[m={:.1},s={:.2}] lin={:.2} \
             nomicro={} jerk0={:.2} fft={:.2} ac={:.2} avg={:.1} att={} cadence={} pattern={}",
            self.score,
            self.periodic,
            self.mechanical,
            self.convergence,
            self.gcd_axis,
            self.gcd_coverage,
            self.gcd_step,
            self.persistent_gcd,
            self.oscillation,
            self.circularity,
            self.const_speed,
            self.robotic_mean,
            self.robotic_std_dev,
            self.linearity,
            self.lacks_micro,
            self.jerk_zero_share,
            self.spectral_peak,
            self.autocorrelation,
            self.average_rotation,
            self.recent_attacks,
            self.cadence_regular,
            self.pattern,
        )
    }
}

/// What a pre-attack snap sequence looked like
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceEvidence {
    pub target: TargetId,
    pub attack: Timestamp,
    #[serde(flatten)]
    pub verdict: SequenceVerdict,
}

impl std::fmt::Display for SequenceEvidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = &self.verdict;
        write!(
            f,
            "{} steps:{} uni:{:.2} cv:{:.2} gcd:{:.3} cov:{:.2} start:{:.1} end[yaw={:.2},pitch={:.2}] profile={}",
            self.target,
            v.steps,
            v.uniformity,
            v.cv,
            v.gcd.step,
            v.gcd.coverage,
            v.initial_error,
            v.end_yaw_error,
            v.end_pitch_error,
            if v.strict { "strict" } else { "balanced" }
        )
    }
}

/// Long-window heuristic scores behind a flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicEvidence {
    #[serde(flatten)]
    pub scores: HeuristicScores,
    pub anomalies: u32,
    pub streak: u32,
}

impl From<HeuristicVerdict> for HeuristicEvidence {
    fn from(v: HeuristicVerdict) -> Self {
        Self {
            scores: v.scores,
            anomalies: v.anomalies,
            streak: v.streak,
        }
    }
}

impl std::fmt::Display for HeuristicEvidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = &self.scores;
        write!(
            f,
            "score={:.2} entropy={:.2} machine={:.2} temporal={:.2} pattern={:.2} snap={:.2} dist={:.2} anomalies={}",
            s.combined,
            s.entropy,
            s.machine_precision,
            s.temporal,
            s.pattern_consistency,
            s.snap_accuracy,
            s.distribution,
            self.anomalies
        )
    }
}

/// Detector-specific evidence carried by a flag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    RotationAnomaly(EvidenceSummary),
    SnapSequence(SequenceEvidence),
    Heuristics(HeuristicEvidence),
}

impl std::fmt::Display for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evidence::RotationAnomaly(e) => write!(f, "{e}"),
            Evidence::SnapSequence(e) => write!(f, "{e}"),
            Evidence::Heuristics(e) => write!(f, "{e}"),
        }
    }
}

/// A detector's verdict that a subject is likely automated.
///
/// `score` is detector-specific: the suspicion score for rotation anomaly,
/// the combined heuristic score for heuristics, and end-aim accuracy in
/// [0, 1] for snap sequences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flag {
    pub subject: SubjectId,
    pub detector: &'static str,
    pub score: f64,
    pub evidence: Evidence,
    pub timestamp: Timestamp,
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} at {}ms: {}",
            self.detector, self.subject, self.timestamp, self.evidence
        )
    }
}
