//! Rotation anomaly detector
//!
//! The façade the host drives. Each event is fed to every enabled detector
//! in the registry: rotation anomaly, snap sequence, then rotation
//! heuristics. Events for different subjects never contend
//! beyond a short map lookup; events for one subject are serialized by that
//! subject's own lock.

pub mod evidence;
pub mod registry;
pub mod resolver;
pub mod subject;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{ConfigError, Settings};
use crate::rotation::{RotationSample, Timestamp};
use crate::{SubjectId, TargetId};

pub use evidence::{Evidence, EvidenceSummary, Flag, HeuristicEvidence, SequenceEvidence};
pub use registry::{
    descriptor, registered, DetectorCategory, DetectorDescriptor, ROTATION_ANOMALY, ROTATION_HEURISTICS, SNAP_SEQUENCE,
};
pub use resolver::{BearingQuery, NoTargets, TargetResolver};
pub use subject::SubjectSnapshot;

use subject::SubjectState;

type SharedState = Arc<Mutex<SubjectState>>;

/// Scores subjects' rotations during combat and emits flags
pub struct RotationAnomalyDetector {
    settings: Settings,
    resolver: Box<dyn TargetResolver>,
    subjects: RwLock<HashMap<SubjectId, SharedState>>,
}

impl RotationAnomalyDetector {
    /// Create a detector. Settings are validated once here.
    pub fn new(settings: Settings, resolver: impl TargetResolver + 'static) -> Result<Self, ConfigError> {
        if let Err(e) = settings.validate() {
            log::warn!("rejecting {} settings: {}", ROTATION_ANOMALY, e);
            return Err(e);
        }
        Ok(Self {
            settings,
            resolver: Box::new(resolver),
            subjects: RwLock::new(HashMap::new()),
        })
    }

    /// Create a detector with default settings and no target positions
    pub fn with_defaults() -> Self {
        Self {
            settings: Settings::default(),
            resolver: Box::new(NoTargets),
            subjects: RwLock::new(HashMap::new()),
        }
    }

    /// Descriptors of the enabled detectors, sorted by name
    pub fn descriptors(&self) -> Vec<&'static DetectorDescriptor> {
        registered()
            .into_iter()
            .filter(|d| self.settings.is_detector_enabled(d.name))
            .collect()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True while at least one registered detector is enabled
    pub fn is_enabled(&self) -> bool {
        registered().iter().any(|d| self.settings.is_detector_enabled(d.name))
    }

    fn subject(&self, id: SubjectId) -> SharedState {
        if let Some(state) = self.subjects.read().get(&id) {
            return Arc::clone(state);
        }
        let mut subjects = self.subjects.write();
        Arc::clone(
            subjects
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(SubjectState::new(id, &self.settings)))),
        )
    }

    /// An orientation update for `subject`
    pub fn on_rotation(
        &self,
        subject: SubjectId,
        timestamp: Timestamp,
        from_yaw: f64,
        to_yaw: f64,
        from_pitch: f64,
        to_pitch: f64,
    ) -> Option<Flag> {
        if !self.is_enabled() {
            return None;
        }
        let sample = RotationSample::from_rotation(timestamp, from_yaw, to_yaw, from_pitch, to_pitch);
        let state = self.subject(subject);
        let mut state = state.lock();
        if state.removed {
            return None;
        }
        state.on_rotation(sample, &self.settings, self.resolver.as_ref())
    }

    /// `subject` attacked `target`
    pub fn on_attack(&self, subject: SubjectId, timestamp: Timestamp, target: TargetId) {
        if !self.is_enabled() {
            return;
        }
        let state = self.subject(subject);
        let mut state = state.lock();
        if !state.removed {
            state.on_attack(timestamp, target, &self.settings);
        }
    }

    /// Periodic idle tick: decay, window expiry and any snap sequence
    /// analysis still waiting for a rotation. Unknown subjects are ignored.
    pub fn on_tick(&self, subject: SubjectId, timestamp: Timestamp) -> Option<Flag> {
        let state = self.subjects.read().get(&subject).cloned()?;
        let mut state = state.lock();
        if state.removed {
            return None;
        }
        state.on_tick(timestamp, &self.settings, self.resolver.as_ref())
    }

    /// Drop all state for `subject`
    pub fn on_subject_removed(&self, subject: SubjectId) {
        let removed = self.subjects.write().remove(&subject);
        if let Some(state) = removed {
            state.lock().removed = true;
            log::debug!("{}: state dropped", subject);
        }
    }

    pub fn snapshot(&self, subject: SubjectId) -> Option<SubjectSnapshot> {
        let state = self.subjects.read().get(&subject).cloned()?;
        let state = state.lock();
        Some(state.snapshot())
    }

    /// Number of tracked subjects
    pub fn subject_count(&self) -> usize {
        self.subjects.read().len()
    }
}
