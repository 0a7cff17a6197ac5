//! Per-subject analysis state
//!
//! Baseline profiling, quantization persistence, snap convergence, attack
//! cadence, the scoring state machine, pre-attack snap sequences and the
//! long-window heuristic counter. Everything here is owned by a single
//! subject and mutated under that subject's lock.

pub mod baseline;
pub mod cadence;
pub mod convergence;
pub mod heuristics;
pub mod persistence;
pub mod scoring;
pub mod sequence;

pub use baseline::{Baseline, BaselineProfiler};
pub use cadence::{AttackHistory, CadenceStats};
pub use convergence::{AimConvergenceWindow, AimSample, ConvergenceResult};
pub use heuristics::{HeuristicProfile, HeuristicScores, HeuristicVerdict};
pub use persistence::{GcdPersistenceTracker, PersistenceVerdict};
pub use scoring::{CombatState, EvidenceGroups, PassInput, PassScore, ScoringEngine};
pub use sequence::{SequenceVerdict, SnapSequenceTracker, StepGcd};
