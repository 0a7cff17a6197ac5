//! Attack history and cadence regularity

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::CadenceSettings;
use crate::rotation::Timestamp;

/// Upper bound on remembered attacks
const MAX_HISTORY: usize = 64;

/// Interval statistics over the most recent attacks
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CadenceStats {
    pub attacks: usize,
    pub mean_interval_ms: f64,
    /// Coefficient of variation of the intervals
    pub cv: f64,
    pub regular: bool,
}

/// Bounded, time-ordered record of a subject's attacks
#[derive(Debug, Clone, Default)]
pub struct AttackHistory {
    times: VecDeque<Timestamp>,
}

impl AttackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at: Timestamp) {
        let idx = self.times.partition_point(|&t| t <= at);
        self.times.insert(idx, at);
        while self.times.len() > MAX_HISTORY {
            self.times.pop_front();
        }
    }

    pub fn last(&self) -> Option<Timestamp> {
        self.times.back().copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The last `n` attack times in order (fewer if unavailable)
    pub fn recent(&self, n: usize) -> Vec<Timestamp> {
        let skip = self.times.len().saturating_sub(n);
        self.times.iter().skip(skip).copied().collect()
    }

    /// Attacks no older than `window_ms` at `now`
    pub fn count_within(&self, now: Timestamp, window_ms: u64) -> usize {
        let cutoff = now.saturating_sub(window_ms);
        self.times.iter().filter(|&&t| t >= cutoff && t <= now).count()
    }

    /// Interval regularity over the last `settings.history` attacks
    pub fn cadence(&self, settings: &CadenceSettings) -> CadenceStats {
        let take = settings.history.min(self.times.len());
        let recent: Vec<Timestamp> = self.times.iter().skip(self.times.len() - take).copied().collect();
        if recent.len() < settings.min_attacks.max(3) {
            return CadenceStats {
                attacks: recent.len(),
                ..CadenceStats::default()
            };
        }

        let intervals: Vec<f64> = recent.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
        let n = intervals.len() as f64;
        let mean = intervals.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return CadenceStats {
                attacks: recent.len(),
                ..CadenceStats::default()
            };
        }
        let var = intervals.iter().map(|i| (i - mean) * (i - mean)).sum::<f64>() / n;
        let cv = var.sqrt() / mean;

        CadenceStats {
            attacks: recent.len(),
            mean_interval_ms: mean,
            cv,
            regular: cv <= settings.max_cv
                && mean >= settings.min_mean_interval_ms
                && mean <= settings.max_mean_interval_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_within_window() {
        let mut history = AttackHistory::new();
        for t in [100, 1000, 2000, 4500, 5000] {
            history.record(t);
        }
        assert_eq!(history.count_within(5000, 4000), 4);
        assert_eq!(history.count_within(5000, 100), 1);
        assert_eq!(history.last(), Some(5000));
        assert_eq!(history.recent(2), vec![4500, 5000]);
        assert_eq!(history.recent(10).len(), 5);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = AttackHistory::new();
        for t in 0..500 {
            history.record(t * 10);
        }
        assert_eq!(history.len(), MAX_HISTORY);
    }

    #[test]
    fn test_metronome_cadence_is_regular() {
        let settings = CadenceSettings::default();
        let mut history = AttackHistory::new();
        for i in 0..12 {
            history.record(i * 500 + (i % 2) * 10);
        }
        let stats = history.cadence(&settings);
        assert_eq!(stats.attacks, settings.history);
        assert!(stats.regular, "{stats:?}");
    }

    #[test]
    fn test_irregular_cadence() {
        let settings = CadenceSettings::default();
        let mut history = AttackHistory::new();
        let mut t = 0;
        for gap in [300, 900, 450, 1200, 350, 700, 500, 1000] {
            t += gap;
            history.record(t);
        }
        assert!(!history.cadence(&settings).regular);
    }

    #[test]
    fn test_too_few_attacks_is_neutral() {
        let settings = CadenceSettings::default();
        let mut history = AttackHistory::new();
        history.record(0);
        history.record(500);
        let stats = history.cadence(&settings);
        assert_eq!(stats.attacks, 2);
        assert!(!stats.regular);
    }
}
