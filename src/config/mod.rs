//! Configuration module
//!
//! Holds every tunable threshold of the detector. The host owns loading;
//! the detector validates once at construction.

pub mod settings;

pub use settings::{
    BaselineSettings, BufferSettings, CadenceSettings, ConvergenceSettings, EvidenceThresholds,
    FeatureSettings, HeuristicSettings, HeuristicWeights, PersistenceSettings, QuantizationSettings,
    ScoringSettings, SequenceSettings, Settings,
};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
