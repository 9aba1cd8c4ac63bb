//! Domain entity identifiers
//!
//! Each identifier is a newtype around UUID v7, giving time-ordered ids that
//! sort in detection order.

use nutype::nutype;
use uuid::Uuid;

/// Unique identifier for an analysis run
#[nutype(derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct AnalysisId(Uuid);

impl AnalysisId {
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Unique identifier for a detected SAA anomaly
#[nutype(derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct AnomalyId(Uuid);

impl AnomalyId {
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Short human-readable form used for marker labels
    pub fn short(&self) -> String {
        self.as_ref().simple().to_string().chars().take(8).collect()
    }
}

impl Default for AnomalyId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Unique identifier for a single domain event
#[nutype(derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRef
))]
pub struct EventId(Uuid);

impl EventId {
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_id_generation() {
        let id1 = AnomalyId::generate();
        let id2 = AnomalyId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_anomaly_id_short_form() {
        let id = AnomalyId::generate();
        let short = id.short();
        assert_eq!(short.len(), 8);
        assert!(id.to_string().replace('-', "").starts_with(&short));
    }

    #[test]
    fn test_ids_are_version_seven() {
        assert_eq!(AnalysisId::generate().as_ref().get_version_num(), 7);
        assert_eq!(EventId::generate().as_ref().get_version_num(), 7);
    }
}
