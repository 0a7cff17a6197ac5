//! Long-window distribution heuristics
//!
//! Scores in [0, 1] over minutes-scale rotation history rather than a single
//! combat window. Each returns 0 below its minimum count.

use std::collections::HashMap;

use crate::rotation::{RotationSample, Timestamp};

/// Frames examined by the machine precision score
const PRECISION_WINDOW: usize = 30;
const PRECISION_MIN_FRAMES: usize = 20;
/// Yaw deltas this close to a multiple of 0.1 degrees count as exact
const PRECISION_TOLERANCE: f64 = 0.01;
/// Only rotations above this magnitude can be exact (degrees)
const PRECISION_MIN_MAGNITUDE: f64 = 5.0;
/// A frame above this followed by one below `STOP_AFTER` is a hard stop
const STOP_BEFORE: f64 = 20.0;
const STOP_AFTER: f64 = 0.5;

const TEMPORAL_MIN_ATTACKS: usize = 10;
const TEMPORAL_MIN_INTERVALS: usize = 3;

const SEGMENT_LEN: usize = 10;
const PATTERN_MIN_FRAMES: usize = 30;

const SNAP_MIN_FRAMES: usize = 10;
/// A snap is a frame above `SNAP_MAGNITUDE` right after one below `SNAP_FROM`
const SNAP_MAGNITUDE: f64 = 30.0;
const SNAP_FROM: f64 = 5.0;
/// Attacks this close to a snap make it accurate (ms)
const SNAP_ATTACK_MS: u64 = 100;
const SNAP_MIN_COUNT: usize = 4;
const SNAP_MIN_ACCURACY: f64 = 0.8;

const DISTRIBUTION_MIN_ANGLES: usize = 20;

/// Histogram bucket of a rotation magnitude (tenths of a degree)
pub fn angle_key(magnitude: f64) -> i64 {
    (magnitude * 10.0) as i64
}

/// Low entropy of the magnitude histogram: `1 - H/Hmax` when the normalized
/// entropy is below `threshold`, else 0
pub fn entropy_score(histogram: &HashMap<i64, u32>, threshold: f64) -> f64 {
    let total: u32 = histogram.values().sum();
    if total == 0 {
        return 0.0;
    }

    let entropy: f64 = histogram
        .values()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = f64::from(c) / f64::from(total);
            -p * p.log2()
        })
        .sum();
    let max_entropy = (histogram.len() as f64).log2();
    let normalized = if max_entropy > 0.0 { entropy / max_entropy } else { 0.0 };

    if normalized < threshold {
        1.0 - normalized
    } else {
        0.0
    }
}

fn near_tenth(value: f64) -> bool {
    let scaled = value.abs() * 10.0;
    (scaled - scaled.round()).abs() * 0.1 < PRECISION_TOLERANCE
}

/// Exact tenth-degree yaw turns and hard stops after large turns, over the
/// last frames
pub fn machine_precision_score(frames: &[RotationSample]) -> f64 {
    if frames.len() < PRECISION_MIN_FRAMES {
        return 0.0;
    }
    let recent = &frames[frames.len().saturating_sub(PRECISION_WINDOW)..];

    let exact = recent
        .iter()
        .filter(|f| near_tenth(f.yaw_delta) && f.magnitude() > PRECISION_MIN_MAGNITUDE)
        .count();
    let stops = recent
        .windows(2)
        .filter(|w| w[0].magnitude() > STOP_BEFORE && w[1].magnitude() < STOP_AFTER)
        .count();

    let n = recent.len() as f64;
    (exact as f64 / n * 2.0 + stops as f64 / n * 3.0).min(1.0)
}

/// Regularity of attack intervals: 0.5 when the coefficient of variation is
/// below 0.3, else 0
pub fn temporal_anomaly_score(attacks: &[Timestamp]) -> f64 {
    if attacks.len() < TEMPORAL_MIN_ATTACKS {
        return 0.0;
    }
    let intervals: Vec<f64> = attacks
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]) as f64)
        .collect();
    if intervals.len() < TEMPORAL_MIN_INTERVALS {
        return 0.0;
    }

    let n = intervals.len() as f64;
    let mean = intervals.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = intervals.iter().map(|i| (i - mean) * (i - mean)).sum::<f64>() / n;
    if var.sqrt() / mean < 0.3 {
        0.5
    } else {
        0.0
    }
}

/// `1 - cv` of the summed magnitude over consecutive 10-frame segments
pub fn pattern_consistency_score(frames: &[RotationSample]) -> f64 {
    if frames.len() < PATTERN_MIN_FRAMES {
        return 0.0;
    }
    // A trailing partial segment is ignored.
    let segments: Vec<f64> = frames
        .chunks_exact(SEGMENT_LEN)
        .map(|c| c.iter().map(RotationSample::magnitude).sum())
        .collect();
    if segments.len() < 2 {
        return 0.0;
    }

    let n = segments.len() as f64;
    let mean = segments.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let var = segments.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    (1.0 - var.sqrt() / mean).clamp(0.0, 1.0)
}

/// Share of snaps from near-rest that land within 100ms of an attack.
/// Reported only above four snaps and 80% accuracy.
pub fn snap_accuracy_score(frames: &[RotationSample], attacks: &[Timestamp]) -> f64 {
    if frames.len() < SNAP_MIN_FRAMES {
        return 0.0;
    }

    let snaps: Vec<Timestamp> = frames
        .windows(2)
        .filter(|w| w[1].magnitude() > SNAP_MAGNITUDE && w[0].magnitude() < SNAP_FROM)
        .map(|w| w[1].timestamp)
        .collect();
    if snaps.is_empty() {
        return 0.0;
    }

    let accurate = snaps
        .iter()
        .filter(|&&t| attacks.iter().any(|&a| a.abs_diff(t) < SNAP_ATTACK_MS))
        .count();
    let accuracy = accurate as f64 / snaps.len() as f64;

    if accuracy > SNAP_MIN_ACCURACY && snaps.len() >= SNAP_MIN_COUNT {
        accuracy
    } else {
        0.0
    }
}

/// Narrow magnitude distributions: 1 for a tiny interquartile range or a
/// median absolute deviation below 0.5, 0.5 below 2.0, else 0
pub fn distribution_anomaly_score(magnitudes: &[f64]) -> f64 {
    if magnitudes.len() < DISTRIBUTION_MIN_ANGLES {
        return 0.0;
    }
    let mut sorted = magnitudes.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if sorted[3 * n / 4] - sorted[n / 4] < 0.1 {
        return 1.0;
    }

    let median = sorted[n / 2];
    let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - median).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    let mad = deviations[n / 2];

    if mad < 0.5 {
        1.0
    } else if mad < 2.0 {
        0.5
    } else {
        0.0
    }
}
