//! Synthetic rotation streams
//!
//! Generators for replaying human-like and scripted aim through the
//! detector without a live host.

pub mod humanize;

use serde::Serialize;

use crate::rotation::{clamp_pitch, wrap_degrees, Timestamp};

pub use humanize::HumanAim;

/// Source of per-update (yaw, pitch) deltas in degrees
pub trait AimGenerator {
    fn next_delta(&mut self) -> (f64, f64);
}

/// Scripted aim that turns in whole multiples of a fixed step, flipping
/// direction every update
#[derive(Debug, Clone)]
pub struct ScriptedAim {
    step: f64,
    multiples: Vec<u32>,
    index: usize,
}

impl ScriptedAim {
    /// Multiples cycle through 2, 3, 4
    pub fn new(step: f64) -> Self {
        Self::with_multiples(step, vec![2, 3, 4])
    }

    pub fn with_multiples(step: f64, multiples: Vec<u32>) -> Self {
        let multiples = if multiples.is_empty() { vec![1] } else { multiples };
        Self {
            step,
            multiples,
            index: 0,
        }
    }
}

impl AimGenerator for ScriptedAim {
    fn next_delta(&mut self) -> (f64, f64) {
        let k = self.multiples[self.index % self.multiples.len()];
        let sign = if self.index % 2 == 0 { 1.0 } else { -1.0 };
        self.index += 1;
        (sign * self.step * k as f64, 0.0)
    }
}

/// One orientation update as the host would deliver it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotationEvent {
    pub timestamp: Timestamp,
    pub from_yaw: f64,
    pub to_yaw: f64,
    pub from_pitch: f64,
    pub to_pitch: f64,
}

/// Endless stream of orientation updates at a fixed interval
pub struct RotationStream<G> {
    generator: G,
    yaw: f64,
    pitch: f64,
    next_timestamp: Timestamp,
    interval_ms: u64,
}

impl<G: AimGenerator> RotationStream<G> {
    pub fn new(generator: G, start: Timestamp, interval_ms: u64) -> Self {
        Self {
            generator,
            yaw: 0.0,
            pitch: 0.0,
            next_timestamp: start,
            interval_ms,
        }
    }
}

impl<G: AimGenerator> Iterator for RotationStream<G> {
    type Item = RotationEvent;

    fn next(&mut self) -> Option<RotationEvent> {
        let (dy, dp) = self.generator.next_delta();
        let event = RotationEvent {
            timestamp: self.next_timestamp,
            from_yaw: self.yaw,
            to_yaw: wrap_degrees(self.yaw + dy),
            from_pitch: self.pitch,
            to_pitch: clamp_pitch(self.pitch + dp),
        };
        self.yaw = event.to_yaw;
        self.pitch = event.to_pitch;
        self.next_timestamp += self.interval_ms;
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_alternates_in_step_multiples() {
        let mut aim = ScriptedAim::new(2.0);
        let deltas: Vec<f64> = (0..6).map(|_| aim.next_delta().0).collect();
        assert_eq!(deltas, vec![4.0, -6.0, 8.0, -4.0, 6.0, -8.0]);
    }

    #[test]
    fn test_stream_chains_orientation() {
        let events: Vec<RotationEvent> = RotationStream::new(ScriptedAim::new(2.0), 100, 50).take(3).collect();
        assert_eq!(events[0].timestamp, 100);
        assert_eq!(events[2].timestamp, 200);
        assert_eq!(events[0].to_yaw, 4.0);
        assert_eq!(events[1].from_yaw, 4.0);
        assert_eq!(events[1].to_yaw, -2.0);
    }

    #[test]
    fn test_stream_keeps_angles_in_range() {
        let stream = RotationStream::new(ScriptedAim::with_multiples(30.0, vec![3]), 0, 50);
        for e in stream.take(200) {
            assert!(e.to_yaw > -180.0 && e.to_yaw <= 180.0);
            assert!((-90.0..=90.0).contains(&e.to_pitch));
        }
    }
}
