//! Aimwatch - rotation anomaly scoring for game servers
//!
//! Watches each player's orientation updates and attacks, extracts
//! statistical features from short sliding windows, and accumulates a
//! decaying suspicion score that flags sustained, distinctive automated aim.
//!
//! ## Usage
//!
//! The host owns the event loop. It feeds rotations, attacks and ticks into
//! a [`RotationAnomalyDetector`] and forwards returned [`Flag`]s to its own
//! alerting. Target positions are supplied on demand through a
//! [`TargetResolver`].

pub mod analysis;
pub mod config;
pub mod detector;
pub mod features;
pub mod rotation;
pub mod sim;

use serde::{Deserialize, Serialize};

pub use config::{ConfigError, Settings};
pub use detector::{
    BearingQuery, Evidence, EvidenceSummary, Flag, NoTargets, RotationAnomalyDetector, SubjectSnapshot, TargetResolver,
};

/// Stable identifier of a tracked player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub u64);

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subject#{}", self.0)
    }
}

/// Stable identifier of an attacked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "target#{}", self.0)
    }
}
