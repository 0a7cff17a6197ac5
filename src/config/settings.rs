//! Detector settings and presets
//!
//! Defines all tunable thresholds. None of the defaults are claimed optimal;
//! they are starting points to calibrate against real traffic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::detector::{ROTATION_ANOMALY, ROTATION_HEURISTICS, SNAP_SEQUENCE};

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-detector enable flags, keyed by detector name
    pub detectors: BTreeMap<String, bool>,
    /// Sample buffer settings
    pub buffer: BufferSettings,
    /// Quantization (GCD) scanner settings
    pub quantization: QuantizationSettings,
    /// Feature extractor floors and minimum counts
    pub features: FeatureSettings,
    /// GCD persistence tracker settings
    pub persistence: PersistenceSettings,
    /// Idle baseline profiler settings
    pub baseline: BaselineSettings,
    /// Snap convergence window settings
    pub convergence: ConvergenceSettings,
    /// Scoring engine settings
    pub scoring: ScoringSettings,
    /// Pre-attack snap sequence settings
    pub sequence: SequenceSettings,
    /// Long-window rotation heuristics settings
    pub heuristics: HeuristicSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let mut detectors = BTreeMap::new();
        detectors.insert(ROTATION_ANOMALY.to_string(), true);
        detectors.insert(SNAP_SEQUENCE.to_string(), true);
        detectors.insert(ROTATION_HEURISTICS.to_string(), false);

        Self {
            detectors,
            buffer: BufferSettings::default(),
            quantization: QuantizationSettings::default(),
            features: FeatureSettings::default(),
            persistence: PersistenceSettings::default(),
            baseline: BaselineSettings::default(),
            convergence: ConvergenceSettings::default(),
            scoring: ScoringSettings::default(),
            sequence: SequenceSettings::default(),
            heuristics: HeuristicSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document. Missing sections keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Whether a detector is enabled. Unknown detectors default to enabled.
    pub fn is_detector_enabled(&self, name: &str) -> bool {
        self.detectors.get(name).copied().unwrap_or(true)
    }

    /// Enable or disable a detector by name
    pub fn set_detector_enabled(&mut self, name: &str, enabled: bool) {
        self.detectors.insert(name.to_string(), enabled);
    }

    /// Create settings that flag sooner on less accumulated evidence
    pub fn strict() -> Self {
        Self {
            persistence: PersistenceSettings {
                required_persist: 2,
                ..Default::default()
            },
            scoring: ScoringSettings {
                flag_threshold: 6.0,
                cooldown_ms: 2500,
                min_recent_attacks: 2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create settings that require longer, cleaner evidence before flagging
    pub fn lenient() -> Self {
        Self {
            persistence: PersistenceSettings {
                lock_coverage: 0.97,
                required_persist: 4,
                ..Default::default()
            },
            scoring: ScoringSettings {
                flag_threshold: 9.0,
                cooldown_ms: 5000,
                min_recent_attacks: 4,
                decay_per_second: 5.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Check every section for values outside a sane range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buffer.validate()?;
        self.quantization.validate()?;
        self.features.validate()?;
        self.persistence.validate()?;
        self.baseline.validate()?;
        self.convergence.validate()?;
        self.scoring.validate()?;
        self.sequence.validate()?;
        self.heuristics.validate()?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be non-negative, got {value}")))
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be within [0, 1], got {value}")))
    }
}

fn nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be greater than zero"))
    }
}

/// Per-subject sample buffer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    /// Samples older than this are evicted (ms)
    pub window_ms: u64,
    /// Hard cap on retained samples under event bursts
    pub max_samples: usize,
    /// Rotations with both |yaw| and |pitch| delta below this are dropped (degrees)
    pub min_delta: f64,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            window_ms: 3000,
            max_samples: 64,
            min_delta: 0.02,
        }
    }
}

impl BufferSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        nonzero("buffer.window_ms", self.window_ms)?;
        nonzero("buffer.max_samples", self.max_samples as u64)?;
        non_negative("buffer.min_delta", self.min_delta)
    }
}

/// Quantization step scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationSettings {
    /// Smallest candidate step (degrees)
    pub step_min: f64,
    /// Largest candidate step (degrees)
    pub step_max: f64,
    /// Scan resolution (degrees)
    pub resolution: f64,
    /// Absolute tolerance floor
    pub tolerance_base: f64,
    /// Tolerance as a fraction of the candidate step
    pub tolerance_factor: f64,
    /// Deltas with smaller magnitude are ignored
    pub min_abs_delta: f64,
    /// Minimum deltas required to attempt a fit
    pub min_deltas: usize,
}

impl Default for QuantizationSettings {
    fn default() -> Self {
        Self {
            step_min: 0.01,
            step_max: 3.0,
            resolution: 0.0025,
            tolerance_base: 0.002,
            tolerance_factor: 0.02,
            min_abs_delta: 0.5,
            min_deltas: 8,
        }
    }
}

impl QuantizationSettings {
    /// Tolerance applied to a candidate step
    pub fn tolerance(&self, step: f64) -> f64 {
        self.tolerance_base.max(step * self.tolerance_factor)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive("quantization.step_min", self.step_min)?;
        positive("quantization.resolution", self.resolution)?;
        if self.step_max <= self.step_min {
            return Err(ConfigError::invalid(
                "quantization.step_max",
                "must be greater than step_min",
            ));
        }
        if (self.step_max - self.step_min) / self.resolution > 100_000.0 {
            return Err(ConfigError::invalid(
                "quantization.resolution",
                "scan would exceed 100000 candidates",
            ));
        }
        non_negative("quantization.tolerance_base", self.tolerance_base)?;
        fraction("quantization.tolerance_factor", self.tolerance_factor)?;
        non_negative("quantization.min_abs_delta", self.min_abs_delta)?;
        nonzero("quantization.min_deltas", self.min_deltas as u64)
    }
}

/// Feature extractor floors and minimum counts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// Deltas below this are skipped by the oscillation index
    pub oscillation_floor: f64,
    /// Outer deltas of an alternating triple must reach this magnitude
    pub oscillation_peak: f64,
    /// Minimum deltas for the oscillation index
    pub oscillation_min_samples: usize,
    /// Delta vectors shorter than this are skipped by the circularity index
    pub circularity_floor: f64,
    /// Normalized cross product needed for a curved pair
    pub circularity_cross: f64,
    /// Bonus per same-signed curved pair in a run
    pub circularity_bonus_step: f64,
    /// Cap on the run bonus
    pub circularity_bonus_max: f64,
    /// Minimum vectors for the circularity index
    pub circularity_min_samples: usize,
    /// Speeds below this are ignored by constant-speed and robotic stats
    pub speed_floor: f64,
    /// Consecutive speeds closer than this count as constant
    pub speed_tolerance: f64,
    /// Minimum speeds for the constant-speed ratio
    pub const_speed_min_samples: usize,
    /// Minimum speeds for robotic consistency stats
    pub robotic_min_samples: usize,
    /// Second differences below this count as zero acceleration change
    pub linear_tolerance: f64,
    /// First differences must exceed this for a linear triple
    pub linear_min_delta: f64,
    /// Minimum samples for the linearity ratio
    pub linear_min_samples: usize,
    /// Jerk magnitudes below this count as zero
    pub jerk_zero_tolerance: f64,
    /// Minimum samples for the jerk-zero share
    pub jerk_min_samples: usize,
    /// Lower bound of the micro-correction band (exclusive)
    pub micro_band_low: f64,
    /// Upper bound of the micro-correction band (exclusive)
    pub micro_band_high: f64,
    /// Micro ratio below which a window lacks micro-corrections
    pub no_micro_ratio_max: f64,
    /// Mean magnitude above which a window lacks micro-corrections
    pub no_micro_mean_min: f64,
    /// Minimum samples for the spectral peak ratio
    pub spectral_min_samples: usize,
    /// Minimum samples for the autocorrelation peak
    pub autocorr_min_samples: usize,
    /// Largest lag examined by the autocorrelation peak
    pub autocorr_max_lag: usize,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            oscillation_floor: 1.0,
            oscillation_peak: 2.5,
            oscillation_min_samples: 8,
            circularity_floor: 1.0,
            circularity_cross: 0.65,
            circularity_bonus_step: 0.015,
            circularity_bonus_max: 0.15,
            circularity_min_samples: 8,
            speed_floor: 2.0,
            speed_tolerance: 0.8,
            const_speed_min_samples: 6,
            robotic_min_samples: 4,
            linear_tolerance: 0.4,
            linear_min_delta: 0.8,
            linear_min_samples: 8,
            jerk_zero_tolerance: 0.15,
            jerk_min_samples: 8,
            micro_band_low: 0.1,
            micro_band_high: 1.8,
            no_micro_ratio_max: 0.12,
            no_micro_mean_min: 4.5,
            spectral_min_samples: 12,
            autocorr_min_samples: 12,
            autocorr_max_lag: 7,
        }
    }
}

impl FeatureSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("features.oscillation_floor", self.oscillation_floor)?;
        non_negative("features.oscillation_peak", self.oscillation_peak)?;
        non_negative("features.circularity_floor", self.circularity_floor)?;
        non_negative("features.circularity_bonus_step", self.circularity_bonus_step)?;
        non_negative("features.circularity_bonus_max", self.circularity_bonus_max)?;
        non_negative("features.speed_floor", self.speed_floor)?;
        positive("features.speed_tolerance", self.speed_tolerance)?;
        positive("features.linear_tolerance", self.linear_tolerance)?;
        non_negative("features.linear_min_delta", self.linear_min_delta)?;
        positive("features.jerk_zero_tolerance", self.jerk_zero_tolerance)?;
        non_negative("features.micro_band_low", self.micro_band_low)?;
        positive("features.no_micro_mean_min", self.no_micro_mean_min)?;
        fraction("features.circularity_cross", self.circularity_cross)?;
        fraction("features.no_micro_ratio_max", self.no_micro_ratio_max)?;
        if self.micro_band_high <= self.micro_band_low {
            return Err(ConfigError::invalid(
                "features.micro_band_high",
                "must be greater than micro_band_low",
            ));
        }
        if self.autocorr_max_lag < 2 {
            return Err(ConfigError::invalid(
                "features.autocorr_max_lag",
                "must be at least 2",
            ));
        }
        if self.spectral_min_samples < 2 {
            return Err(ConfigError::invalid(
                "features.spectral_min_samples",
                "must be at least 2",
            ));
        }
        Ok(())
    }
}

/// GCD persistence tracker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Coverage needed for a quantization fit to count as strong
    pub lock_coverage: f64,
    /// Deltas needed for a quantization fit to count as strong
    pub min_samples: usize,
    /// Steps closer than this are the same step
    pub step_tolerance: f64,
    /// Plausible step range, lower bound (exclusive)
    pub min_step: f64,
    /// Plausible step range, upper bound (inclusive)
    pub max_step: f64,
    /// Consecutive strong passes before the step is evidence
    pub required_persist: u32,
    /// A step this close to the idle baseline step is not evidence
    pub baseline_same_tolerance: f64,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            lock_coverage: 0.95,
            min_samples: 10,
            step_tolerance: 0.005,
            min_step: 0.005,
            max_step: 3.0,
            required_persist: 3,
            baseline_same_tolerance: 0.005,
        }
    }
}

impl PersistenceSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        fraction("persistence.lock_coverage", self.lock_coverage)?;
        positive("persistence.step_tolerance", self.step_tolerance)?;
        if self.max_step <= self.min_step {
            return Err(ConfigError::invalid(
                "persistence.max_step",
                "must be greater than min_step",
            ));
        }
        nonzero("persistence.required_persist", self.required_persist as u64)
    }
}

/// Idle baseline profiler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineSettings {
    /// No attack within this interval means the subject is idle (ms)
    pub idle_after_attack_ms: u64,
    /// Minimum time between two baseline updates (ms)
    pub min_update_interval_ms: u64,
    /// Samples taken from the end of the buffer
    pub window: usize,
    /// Minimum samples in that window
    pub min_window_samples: usize,
    /// Minimum significant samples after filtering
    pub min_significant_samples: usize,
    /// Steady-state EMA weight
    pub alpha: f64,
    /// EMA weight for the first observation
    pub cold_start_alpha: f64,
}

impl Default for BaselineSettings {
    fn default() -> Self {
        Self {
            idle_after_attack_ms: 5000,
            min_update_interval_ms: 600,
            window: 32,
            min_window_samples: 18,
            min_significant_samples: 14,
            alpha: 0.20,
            cold_start_alpha: 1.0,
        }
    }
}

impl BaselineSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        fraction("baseline.alpha", self.alpha)?;
        fraction("baseline.cold_start_alpha", self.cold_start_alpha)?;
        positive("baseline.alpha", self.alpha)?;
        positive("baseline.cold_start_alpha", self.cold_start_alpha)?;
        nonzero("baseline.window", self.window as u64)
    }
}

/// Snap convergence window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    /// How long a window stays open after an attack (ms)
    pub window_ms: u64,
    /// Error samples retained per window
    pub max_samples: usize,
    /// Error samples needed before evaluation
    pub min_samples: usize,
    /// A step ratio at or below this is a strong contraction
    pub strong_ratio: f64,
    /// Strong steps needed for a positive result
    pub min_strong_steps: usize,
    /// Geometric mean contraction must be at or below this
    pub geometric_mean_max: f64,
    /// Final error must be at or below this fraction of the initial error
    pub final_error_fraction: f64,
    /// ... or at or below this absolute error, whichever is larger (degrees)
    pub final_error_floor: f64,
    /// Step ratios are clamped to [ratio_min, ratio_max] for the geometric mean
    pub ratio_min: f64,
    pub ratio_max: f64,
    /// Errors below this cannot anchor a ratio (degrees)
    pub min_error: f64,
    /// Score added for a positive result
    pub gain: f64,
    /// Aim reference point as a fraction of target height
    pub reference_height_fraction: f64,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            window_ms: 600,
            max_samples: 16,
            min_samples: 6,
            strong_ratio: 0.55,
            min_strong_steps: 3,
            geometric_mean_max: 0.70,
            final_error_fraction: 0.20,
            final_error_floor: 1.5,
            ratio_min: 1e-3,
            ratio_max: 2.0,
            min_error: 1e-3,
            gain: 1.0,
            reference_height_fraction: 0.6,
        }
    }
}

impl ConvergenceSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        nonzero("convergence.window_ms", self.window_ms)?;
        if self.min_samples < 2 || self.min_samples > self.max_samples {
            return Err(ConfigError::invalid(
                "convergence.min_samples",
                "must be at least 2 and no more than max_samples",
            ));
        }
        positive("convergence.strong_ratio", self.strong_ratio)?;
        positive("convergence.geometric_mean_max", self.geometric_mean_max)?;
        fraction("convergence.final_error_fraction", self.final_error_fraction)?;
        positive("convergence.ratio_min", self.ratio_min)?;
        if self.ratio_max <= self.ratio_min {
            return Err(ConfigError::invalid(
                "convergence.ratio_max",
                "must be greater than ratio_min",
            ));
        }
        non_negative("convergence.gain", self.gain)?;
        fraction(
            "convergence.reference_height_fraction",
            self.reference_height_fraction,
        )
    }
}

/// Thresholds that turn feature values into group A/B evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceThresholds {
    pub oscillation: f64,
    pub circularity: f64,
    pub spectral_peak: f64,
    pub autocorrelation: f64,
    pub const_speed: f64,
    pub const_speed_min_samples: usize,
    pub robotic_std_max: f64,
    pub robotic_mean_min: f64,
    pub robotic_min_samples: usize,
    pub linearity: f64,
    pub jerk_zero_share: f64,
}

impl Default for EvidenceThresholds {
    fn default() -> Self {
        Self {
            oscillation: 0.55,
            circularity: 0.62,
            spectral_peak: 0.65,
            autocorrelation: 0.55,
            const_speed: 0.70,
            const_speed_min_samples: 8,
            robotic_std_max: 1.20,
            robotic_mean_min: 5.0,
            robotic_min_samples: 6,
            linearity: 0.50,
            jerk_zero_share: 0.75,
        }
    }
}

/// Attack cadence regularity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceSettings {
    pub enabled: bool,
    /// Attack timestamps retained for cadence analysis
    pub history: usize,
    /// Attacks needed before cadence is judged
    pub min_attacks: usize,
    /// Coefficient of variation at or below which cadence is regular
    pub max_cv: f64,
    /// Plausible mean interval range (ms)
    pub min_mean_interval_ms: f64,
    pub max_mean_interval_ms: f64,
    /// Score added for a regular cadence
    pub bonus: f64,
}

impl Default for CadenceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            history: 10,
            min_attacks: 6,
            max_cv: 0.12,
            min_mean_interval_ms: 350.0,
            max_mean_interval_ms: 800.0,
            bonus: 0.35,
        }
    }
}

/// Scoring engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// An attack within this interval puts the subject in combat (ms)
    pub attack_window_ms: u64,
    /// Minimum time between analysis passes while in combat (ms)
    pub analysis_interval_ms: u64,
    /// Samples taken from the end of the buffer per pass
    pub analysis_window: usize,
    /// Minimum samples in that window
    pub min_samples: usize,
    /// Minimum significant samples after filtering
    pub min_significant_samples: usize,
    /// Rotation magnitude for a sample to be significant (degrees)
    pub significant_delta: f64,
    /// Group A/B feature thresholds
    pub thresholds: EvidenceThresholds,
    /// Added when two or more groups hold
    pub base_increment: f64,
    /// Added when both A and B hold
    pub both_ab_bonus: f64,
    /// Added when C holds alongside another group
    pub convergence_bonus: f64,
    /// Added when the persistent GCD verdict holds alongside another group
    pub persistent_gcd_bonus: f64,
    /// Added when only C and persistent GCD hold
    pub weak_corroboration_increment: f64,
    /// Window lacks micro-corrections while baseline has them
    pub baseline_micro_bonus: f64,
    pub baseline_micro_min: f64,
    /// Window jerk-zero share high while baseline share is low
    pub baseline_jerk_bonus: f64,
    pub baseline_jerk_max: f64,
    /// Persistent step differs from the idle step
    pub baseline_step_bonus: f64,
    pub baseline_step_delta: f64,
    /// Score lost per second absent evidence
    pub decay_per_second: f64,
    /// Score at which a flag may fire
    pub flag_threshold: f64,
    /// Upper clamp on the score
    pub clamp_max: f64,
    /// Subtracted from the score when a flag fires
    pub flag_rebate: f64,
    /// Attacks needed within `recent_attack_window_ms` before a flag may fire
    pub min_recent_attacks: usize,
    pub recent_attack_window_ms: u64,
    /// Minimum time between two flags for one subject (ms)
    pub cooldown_ms: u64,
    /// Attack cadence regularity bonus
    pub cadence: CadenceSettings,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            attack_window_ms: 2500,
            analysis_interval_ms: 200,
            analysis_window: 32,
            min_samples: 16,
            min_significant_samples: 14,
            significant_delta: 0.25,
            thresholds: EvidenceThresholds::default(),
            base_increment: 1.6,
            both_ab_bonus: 0.5,
            convergence_bonus: 0.5,
            persistent_gcd_bonus: 0.8,
            weak_corroboration_increment: 0.7,
            baseline_micro_bonus: 0.4,
            baseline_micro_min: 0.25,
            baseline_jerk_bonus: 0.3,
            baseline_jerk_max: 0.40,
            baseline_step_bonus: 0.25,
            baseline_step_delta: 0.015,
            decay_per_second: 4.0,
            flag_threshold: 7.0,
            clamp_max: 20.0,
            flag_rebate: 4.0,
            min_recent_attacks: 3,
            recent_attack_window_ms: 4000,
            cooldown_ms: 3500,
            cadence: CadenceSettings::default(),
        }
    }
}

impl ScoringSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        nonzero("scoring.attack_window_ms", self.attack_window_ms)?;
        nonzero("scoring.analysis_window", self.analysis_window as u64)?;
        if self.min_samples > self.analysis_window {
            return Err(ConfigError::invalid(
                "scoring.min_samples",
                "must not exceed analysis_window",
            ));
        }
        positive("scoring.decay_per_second", self.decay_per_second)?;
        positive("scoring.clamp_max", self.clamp_max)?;
        positive("scoring.flag_threshold", self.flag_threshold)?;
        if self.flag_threshold > self.clamp_max {
            return Err(ConfigError::invalid(
                "scoring.flag_threshold",
                "must not exceed clamp_max",
            ));
        }
        non_negative("scoring.flag_rebate", self.flag_rebate)?;
        if self.flag_rebate > self.flag_threshold {
            return Err(ConfigError::invalid(
                "scoring.flag_rebate",
                "must not exceed flag_threshold",
            ));
        }
        fraction("scoring.baseline_micro_min", self.baseline_micro_min)?;
        fraction("scoring.baseline_jerk_max", self.baseline_jerk_max)?;
        fraction("scoring.thresholds.jerk_zero_share", self.thresholds.jerk_zero_share)?;
        if self.cadence.enabled && self.cadence.min_attacks < 3 {
            return Err(ConfigError::invalid(
                "scoring.cadence.min_attacks",
                "must be at least 3",
            ));
        }
        Ok(())
    }
}

/// Pre-attack snap sequence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceSettings {
    /// Rotations this long before the attack are examined (ms)
    pub pre_window_ms: u64,
    /// Rotations this long after the attack are examined (ms)
    pub post_window_ms: u64,
    /// A rotation this long after the attack triggers the analysis (ms)
    pub analyze_after_ms: u64,
    /// A tick this long after the attack triggers the analysis (ms)
    pub tick_analyze_after_ms: u64,
    /// The sequence must end no earlier than this before the attack (ms)
    pub near_attack_ms: u64,
    /// Accepted spacing between consecutive steps (ms)
    pub min_tick_ms: u64,
    pub max_tick_ms: u64,
    /// Yaw steps smaller than this break a sequence (degrees)
    pub min_step: f64,
    /// Accepted sequence lengths
    pub min_steps: usize,
    pub max_steps: usize,
    /// Yaw error to the target before the first step (degrees)
    pub min_initial_error: f64,
    /// Yaw and pitch error to the target after the last step (degrees)
    pub end_yaw_error: f64,
    pub end_pitch_error: f64,
    /// Mean yaw step must reach this (degrees)
    pub min_mean_step: f64,
    /// Step spread over the largest step, strict and balanced profiles
    pub uniformity_strict: f64,
    pub uniformity_balanced: f64,
    /// Step coefficient of variation accepted by the balanced profile
    pub cv_balanced: f64,
    /// Last step over mean step, strict and balanced profiles
    pub last_step_ratio_strict: f64,
    pub last_step_ratio_balanced: f64,
    /// Smallest common step worth reporting (degrees)
    pub gcd_min: f64,
    /// Remainder tolerance when testing a step against the common step (degrees)
    pub gcd_epsilon: f64,
    /// Share of steps on the common step needed by the balanced profile
    pub gcd_coverage_balanced: f64,
    /// Aim reference points tried on the target, as fractions of its height
    pub reference_height_fractions: Vec<f64>,
    /// Minimum spacing between two flags (ms)
    pub cooldown_ms: u64,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            pre_window_ms: 450,
            post_window_ms: 150,
            analyze_after_ms: 60,
            tick_analyze_after_ms: 80,
            near_attack_ms: 150,
            min_tick_ms: 18,
            max_tick_ms: 140,
            min_step: 0.35,
            min_steps: 2,
            max_steps: 7,
            min_initial_error: 10.0,
            end_yaw_error: 1.6,
            end_pitch_error: 3.0,
            min_mean_step: 1.0,
            uniformity_strict: 0.22,
            uniformity_balanced: 0.40,
            cv_balanced: 0.35,
            last_step_ratio_strict: 0.75,
            last_step_ratio_balanced: 0.85,
            gcd_min: 0.01,
            gcd_epsilon: 0.02,
            gcd_coverage_balanced: 0.60,
            reference_height_fractions: vec![0.85, 0.65, 0.50],
            cooldown_ms: 1200,
        }
    }
}

impl SequenceSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tick_ms < self.min_tick_ms {
            return Err(ConfigError::invalid(
                "sequence.max_tick_ms",
                "must not be below min_tick_ms",
            ));
        }
        if self.min_steps < 2 || self.max_steps < self.min_steps {
            return Err(ConfigError::invalid(
                "sequence.min_steps",
                "must be at least 2 and no more than max_steps",
            ));
        }
        positive("sequence.min_step", self.min_step)?;
        non_negative("sequence.min_initial_error", self.min_initial_error)?;
        positive("sequence.end_yaw_error", self.end_yaw_error)?;
        positive("sequence.end_pitch_error", self.end_pitch_error)?;
        non_negative("sequence.min_mean_step", self.min_mean_step)?;
        fraction("sequence.uniformity_strict", self.uniformity_strict)?;
        fraction("sequence.uniformity_balanced", self.uniformity_balanced)?;
        non_negative("sequence.cv_balanced", self.cv_balanced)?;
        positive("sequence.last_step_ratio_strict", self.last_step_ratio_strict)?;
        positive("sequence.last_step_ratio_balanced", self.last_step_ratio_balanced)?;
        positive("sequence.gcd_min", self.gcd_min)?;
        positive("sequence.gcd_epsilon", self.gcd_epsilon)?;
        fraction("sequence.gcd_coverage_balanced", self.gcd_coverage_balanced)?;
        if self.reference_height_fractions.is_empty() {
            return Err(ConfigError::invalid(
                "sequence.reference_height_fractions",
                "must name at least one reference point",
            ));
        }
        for &f in &self.reference_height_fractions {
            fraction("sequence.reference_height_fractions", f)?;
        }
        Ok(())
    }
}

/// Long-window rotation heuristics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicSettings {
    /// Rotation frames retained
    pub max_frames: usize,
    /// Frames needed before the first analysis (exclusive)
    pub min_frames: usize,
    /// Rotation magnitudes retained for the distribution test
    pub distribution_size: usize,
    /// Attacks considered by the temporal and snap scores
    pub attack_history: usize,
    /// Minimum spacing between analyses (ms)
    pub analysis_interval_ms: u64,
    /// Normalized entropy below which the angle histogram is suspicious
    pub entropy_threshold: f64,
    /// Weighted score above which an analysis counts as an anomaly
    pub anomaly_threshold: f64,
    /// Weighted score below which the anomaly count decays
    pub calm_threshold: f64,
    pub weights: HeuristicWeights,
    /// Anomalous analyses needed for a flag
    pub min_anomalies: u32,
    /// ... or this many with a long attack streak
    pub min_anomalies_with_streak: u32,
    /// Attack streak length that lowers the anomaly requirement
    pub streak_hits: u32,
    /// Attacks closer than this extend a streak (ms)
    pub streak_gap_ms: u64,
    /// Anomalies removed after a flag
    pub flag_rebate: u32,
}

/// Weight of each heuristic score in the combined score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub entropy: f64,
    pub machine_precision: f64,
    pub temporal: f64,
    pub pattern_consistency: f64,
    pub snap_accuracy: f64,
    pub distribution: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            entropy: 0.15,
            machine_precision: 0.25,
            temporal: 0.15,
            pattern_consistency: 0.20,
            snap_accuracy: 0.15,
            distribution: 0.10,
        }
    }
}

impl HeuristicWeights {
    pub fn total(&self) -> f64 {
        self.entropy
            + self.machine_precision
            + self.temporal
            + self.pattern_consistency
            + self.snap_accuracy
            + self.distribution
    }
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        Self {
            max_frames: 300,
            min_frames: 50,
            distribution_size: 100,
            attack_history: 50,
            analysis_interval_ms: 2500,
            entropy_threshold: 0.65,
            anomaly_threshold: 0.78,
            calm_threshold: 0.30,
            weights: HeuristicWeights::default(),
            min_anomalies: 3,
            min_anomalies_with_streak: 2,
            streak_hits: 5,
            streak_gap_ms: 100,
            flag_rebate: 2,
        }
    }
}

impl HeuristicSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        nonzero("heuristics.max_frames", self.max_frames as u64)?;
        if self.min_frames >= self.max_frames {
            return Err(ConfigError::invalid(
                "heuristics.min_frames",
                "must be below max_frames",
            ));
        }
        nonzero("heuristics.distribution_size", self.distribution_size as u64)?;
        nonzero("heuristics.attack_history", self.attack_history as u64)?;
        fraction("heuristics.entropy_threshold", self.entropy_threshold)?;
        fraction("heuristics.anomaly_threshold", self.anomaly_threshold)?;
        fraction("heuristics.calm_threshold", self.calm_threshold)?;
        if self.calm_threshold > self.anomaly_threshold {
            return Err(ConfigError::invalid(
                "heuristics.calm_threshold",
                "must not exceed anomaly_threshold",
            ));
        }
        let w = &self.weights;
        for (field, value) in [
            ("heuristics.weights.entropy", w.entropy),
            ("heuristics.weights.machine_precision", w.machine_precision),
            ("heuristics.weights.temporal", w.temporal),
            ("heuristics.weights.pattern_consistency", w.pattern_consistency),
            ("heuristics.weights.snap_accuracy", w.snap_accuracy),
            ("heuristics.weights.distribution", w.distribution),
        ] {
            non_negative(field, value)?;
        }
        if w.total() <= 0.0 {
            return Err(ConfigError::invalid("heuristics.weights", "must not all be zero"));
        }
        nonzero("heuristics.min_anomalies", u64::from(self.min_anomalies))?;
        nonzero(
            "heuristics.min_anomalies_with_streak",
            u64::from(self.min_anomalies_with_streak),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.is_detector_enabled(ROTATION_ANOMALY));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(Settings::strict().validate().is_ok());
        assert!(Settings::lenient().validate().is_ok());
        assert!(Settings::strict().scoring.flag_threshold < Settings::lenient().scoring.flag_threshold);
    }

    #[test]
    fn test_unknown_detector_defaults_enabled() {
        let mut settings = Settings::default();
        assert!(settings.is_detector_enabled("something_else"));
        settings.set_detector_enabled(ROTATION_ANOMALY, false);
        assert!(!settings.is_detector_enabled(ROTATION_ANOMALY));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "scoring": { "flag_threshold": 8.5 }, "detectors": { "rotation_anomaly": false } }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.scoring.flag_threshold, 8.5);
        assert_eq!(settings.scoring.cooldown_ms, 3500);
        assert_eq!(settings.buffer.max_samples, 64);
        assert!(!settings.is_detector_enabled(ROTATION_ANOMALY));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = Settings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_threshold_above_clamp_rejected() {
        let mut settings = Settings::default();
        settings.scoring.flag_threshold = 25.0;
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "scoring.flag_threshold", .. }
        ));
    }

    #[test]
    fn test_inverted_scan_range_rejected() {
        let mut settings = Settings::default();
        settings.quantization.step_max = 0.005;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.quantization.resolution = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_negative_or_nan_feature_floors_rejected() {
        let mut settings = Settings::default();
        settings.features.oscillation_floor = -1.0;
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::Invalid { field: "features.oscillation_floor", .. }
        ));

        let mut settings = Settings::default();
        settings.features.speed_tolerance = f64::NAN;
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::Invalid { field: "features.speed_tolerance", .. }
        ));

        let mut settings = Settings::default();
        settings.features.jerk_zero_tolerance = f64::INFINITY;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.features.circularity_floor = -0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_heuristics_opt_in_by_default() {
        let settings = Settings::default();
        assert!(settings.is_detector_enabled(SNAP_SEQUENCE));
        assert!(!settings.is_detector_enabled(ROTATION_HEURISTICS));
        assert!((settings.heuristics.weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sequence_and_heuristic_ranges_rejected() {
        let mut settings = Settings::default();
        settings.sequence.reference_height_fractions.clear();
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::Invalid { field: "sequence.reference_height_fractions", .. }
        ));

        let mut settings = Settings::default();
        settings.sequence.max_steps = 1;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.heuristics.calm_threshold = 0.9;
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::Invalid { field: "heuristics.calm_threshold", .. }
        ));

        let mut settings = Settings::default();
        settings.heuristics.weights.machine_precision = -0.25;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_fraction_out_of_range_rejected() {
        let mut settings = Settings::default();
        settings.persistence.lock_coverage = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.baseline.alpha = -0.1;
        assert!(settings.validate().is_err());
    }
}
