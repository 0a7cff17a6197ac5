//! Time-bounded per-subject sample buffer

use std::collections::VecDeque;

use super::sample::{RotationSample, Timestamp};
use crate::config::BufferSettings;

/// Fixed-capacity, time-ordered ring of rotation samples.
///
/// Eviction is by age relative to the newest sample, with a count cap on top.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<RotationSample>,
    window_ms: u64,
    max_samples: usize,
}

impl SampleBuffer {
    /// Create an empty buffer
    pub fn new(window_ms: u64, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples.min(256)),
            window_ms,
            max_samples: max_samples.max(1),
        }
    }

    /// Create a buffer from settings
    pub fn from_settings(settings: &BufferSettings) -> Self {
        Self::new(settings.window_ms, settings.max_samples)
    }

    /// Append a sample, keeping time order, then evict stale samples
    pub fn push(&mut self, sample: RotationSample) {
        match self.samples.back() {
            Some(last) if sample.timestamp < last.timestamp => {
                let pos = self
                    .samples
                    .partition_point(|s| s.timestamp <= sample.timestamp);
                self.samples.insert(pos, sample);
            }
            _ => self.samples.push_back(sample),
        }

        if let Some(newest) = self.samples.back().map(|s| s.timestamp) {
            self.prune(newest);
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Drop every sample older than the window, measured from `now`
    pub fn prune(&mut self, now: Timestamp) {
        let cutoff = now.saturating_sub(self.window_ms);
        while self
            .samples
            .front()
            .is_some_and(|s| s.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// The last `n` samples in time order (fewer if unavailable)
    pub fn recent(&self, n: usize) -> Vec<RotationSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    /// Samples with `from <= timestamp <= to`, in time order
    pub fn between(&self, from: Timestamp, to: Timestamp) -> Vec<RotationSample> {
        self.samples
            .iter()
            .filter(|s| (from..=to).contains(&s.timestamp))
            .copied()
            .collect()
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&RotationSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: Timestamp, yaw: f64) -> RotationSample {
        RotationSample::from_rotation(ts, 0.0, yaw, 0.0, 0.0)
    }

    #[test]
    fn test_time_eviction() {
        let mut buf = SampleBuffer::new(1000, 100);
        buf.push(sample(0, 1.0));
        buf.push(sample(500, 2.0));
        buf.push(sample(1200, 3.0));

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.recent(10)[0].timestamp, 500);
    }

    #[test]
    fn test_count_cap() {
        let mut buf = SampleBuffer::new(60_000, 4);
        for i in 0..10 {
            buf.push(sample(i * 10, 1.0 + i as f64));
        }
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.last().unwrap().timestamp, 90);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut buf = SampleBuffer::new(60_000, 64);
        for i in 0..5 {
            buf.push(sample(i * 10, 1.0 + i as f64));
        }
        let tail = buf.recent(3);
        let ts: Vec<_> = tail.iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![20, 30, 40]);
        assert_eq!(buf.recent(100).len(), 5);
    }

    #[test]
    fn test_between_is_inclusive() {
        let mut buf = SampleBuffer::new(60_000, 64);
        for i in 0..10 {
            buf.push(sample(i * 50, 1.0));
        }
        let ts: Vec<_> = buf.between(100, 250).iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![100, 150, 200, 250]);
        assert!(buf.between(1000, 2000).is_empty());
    }

    #[test]
    fn test_out_of_order_insert() {
        let mut buf = SampleBuffer::new(60_000, 64);
        buf.push(sample(100, 1.0));
        buf.push(sample(300, 1.0));
        buf.push(sample(200, 1.0));
        let ts: Vec<_> = buf.recent(3).iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![100, 200, 300]);
    }

    #[test]
    fn test_prune_on_tick() {
        let mut buf = SampleBuffer::new(1000, 64);
        buf.push(sample(0, 1.0));
        buf.push(sample(400, 1.0));
        buf.prune(1300);
        assert_eq!(buf.len(), 1);
        buf.prune(5000);
        assert!(buf.is_empty());
    }
}
