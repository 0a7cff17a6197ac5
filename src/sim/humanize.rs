//! Human-like aim generation
//!
//! Players flick toward a point, overshoot or undershoot a little, and fix
//! it with one or two small corrective moves. Flicks are mostly horizontal.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::AimGenerator;

/// Flick magnitude range in degrees
const MIN_FLICK_DEG: f64 = 3.0;
const MAX_FLICK_DEG: f64 = 15.0;

/// Corrective move magnitude range in degrees
const MIN_CORRECTION_DEG: f64 = 0.5;
const MAX_CORRECTION_DEG: f64 = 1.5;

/// Pitch share of a flick's vertical component
const FLICK_PITCH_SCALE: f64 = 0.35;

/// Hand tremor amplitude added to flicks
const TREMOR_DEG: f64 = 0.08;

/// Generator of human-like rotation deltas
pub struct HumanAim {
    rng: StdRng,
    pending_corrections: u8,
}

impl Default for HumanAim {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanAim {
    /// Create a generator seeded from system entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a deterministic generator
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            pending_corrections: 0,
        }
    }

    /// Approximate gaussian using a sum of uniforms
    fn tremor(&mut self) -> f64 {
        let sum: f64 = (0..3).map(|_| self.rng.gen::<f64>() - 0.5).sum();
        sum * TREMOR_DEG
    }

    fn flick(&mut self) -> (f64, f64) {
        self.pending_corrections = self.rng.gen_range(1..=2);
        let magnitude = self.rng.gen_range(MIN_FLICK_DEG..=MAX_FLICK_DEG);
        let angle = self.rng.gen_range(0.0..TAU);
        let yaw = magnitude * angle.cos() + self.tremor();
        let pitch = magnitude * angle.sin() * FLICK_PITCH_SCALE + self.tremor();
        (yaw, pitch)
    }

    fn correction(&mut self) -> (f64, f64) {
        self.pending_corrections = self.pending_corrections.saturating_sub(1);
        let magnitude = self.rng.gen_range(MIN_CORRECTION_DEG..=MAX_CORRECTION_DEG);
        let angle = self.rng.gen_range(0.0..TAU);
        (magnitude * angle.cos(), magnitude * angle.sin())
    }
}

impl AimGenerator for HumanAim {
    fn next_delta(&mut self) -> (f64, f64) {
        if self.pending_corrections > 0 {
            self.correction()
        } else {
            self.flick()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flicks_then_corrections() {
        let mut aim = HumanAim::seeded(11);
        let deltas: Vec<(f64, f64)> = (0..300).map(|_| aim.next_delta()).collect();

        let small = deltas
            .iter()
            .filter(|(y, p)| y.hypot(*p) <= MAX_CORRECTION_DEG + 1e-9)
            .count();
        let share = small as f64 / deltas.len() as f64;
        assert!((0.45..=0.75).contains(&share), "correction share {share}");
        assert!(deltas.iter().all(|(y, p)| y.hypot(*p) <= MAX_FLICK_DEG + 1.0));
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = HumanAim::seeded(42);
        let mut b = HumanAim::seeded(42);
        for _ in 0..50 {
            assert_eq!(a.next_delta(), b.next_delta());
        }
    }
}
