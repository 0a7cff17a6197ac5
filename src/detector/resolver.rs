//! Host collaborator that locates attack targets

use crate::rotation::Bearing;
use crate::{SubjectId, TargetId};

/// What the detector asks the host during convergence sampling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BearingQuery {
    pub subject: SubjectId,
    pub target: TargetId,
    /// Fraction of the target's height to aim at, from its feet
    pub reference_height_fraction: f64,
}

/// Resolves the ideal bearing from a subject's eye to a live target.
///
/// Returns `None` when the target is gone, dead, or in another world.
/// Called while the subject's state is locked, so it must not call back
/// into the detector.
pub trait TargetResolver: Send + Sync {
    fn resolve_live_bearing(&self, query: BearingQuery) -> Option<Bearing>;
}

impl<F> TargetResolver for F
where
    F: Fn(BearingQuery) -> Option<Bearing> + Send + Sync,
{
    fn resolve_live_bearing(&self, query: BearingQuery) -> Option<Bearing> {
        self(query)
    }
}

/// Resolver for hosts without target positions. Convergence never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTargets;

impl TargetResolver for NoTargets {
    fn resolve_live_bearing(&self, _query: BearingQuery) -> Option<Bearing> {
        None
    }
}
