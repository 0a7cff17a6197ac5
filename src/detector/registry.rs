//! Static table of known detectors

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Name of the rotation anomaly detector
pub const ROTATION_ANOMALY: &str = "rotation_anomaly";

/// Name of the pre-attack snap sequence detector
pub const SNAP_SEQUENCE: &str = "snap_sequence";

/// Name of the long-window rotation heuristics detector
pub const ROTATION_HEURISTICS: &str = "rotation_heuristics";

/// How much weight a detector's flags deserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DetectorCategory {
    /// Multi-signal evidence, suitable for automated action
    Combat,
    /// Narrow or heuristic signals, for review only
    Experimental,
}

impl std::fmt::Display for DetectorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DetectorCategory::Combat => "Combat",
            DetectorCategory::Experimental => "Experimental",
        };
        write!(f, "{name}")
    }
}

/// Static metadata for a detector
#[derive(Debug, Clone, Serialize)]
pub struct DetectorDescriptor {
    pub name: &'static str,
    pub category: DetectorCategory,
    pub description: &'static str,
}

static REGISTRY: Lazy<HashMap<&'static str, DetectorDescriptor>> = Lazy::new(|| {
    let descriptors = [
        DetectorDescriptor {
            name: ROTATION_ANOMALY,
            category: DetectorCategory::Combat,
            description: "Scores rotation windows during combat for signs of automated aim",
        },
        DetectorDescriptor {
            name: SNAP_SEQUENCE,
            category: DetectorCategory::Experimental,
            description: "Finds short uniform, quantized turns that land on the target just before a hit",
        },
        DetectorDescriptor {
            name: ROTATION_HEURISTICS,
            category: DetectorCategory::Experimental,
            description: "Scores the shape of long-run rotation distributions against attack timing",
        },
    ];
    descriptors.into_iter().map(|d| (d.name, d)).collect()
});

/// Look up a detector by name
pub fn descriptor(name: &str) -> Option<&'static DetectorDescriptor> {
    REGISTRY.get(name)
}

/// All registered detectors, sorted by name
pub fn registered() -> Vec<&'static DetectorDescriptor> {
    let mut all: Vec<_> = REGISTRY.values().collect();
    all.sort_by_key(|d| d.name);
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_anomaly_is_registered() {
        let d = descriptor(ROTATION_ANOMALY).unwrap();
        assert_eq!(d.category, DetectorCategory::Combat);
        assert!(descriptor("reach").is_none());
    }

    #[test]
    fn test_registered_is_sorted() {
        let names: Vec<_> = registered().iter().map(|d| d.name).collect();
        assert_eq!(names, vec![ROTATION_ANOMALY, ROTATION_HEURISTICS, SNAP_SEQUENCE]);
        assert_eq!(
            descriptor(SNAP_SEQUENCE).map(|d| d.category),
            Some(DetectorCategory::Experimental)
        );
    }
}
