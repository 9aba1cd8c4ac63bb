//! Validation errors for domain value objects and entities
//!
//! Value-object invariants are enforced eagerly at construction; a failed
//! construction is never recoverable, so these errors carry the offending value
//! for diagnostics only.

use thiserror::Error;

/// Errors raised when a domain invariant is violated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid longitude: {0}. Must be between -180 and 180 degrees.")]
    Longitude(f64),

    #[error("Invalid latitude: {0}. Must be between -90 and 90 degrees.")]
    Latitude(f64),

    #[error("Invalid altitude: {0}. Must be non-negative.")]
    Altitude(f64),

    #[error("Invalid L-shell value: {0}. Must be >= 1.0")]
    LShell(f64),

    #[error("Invalid magnetic local time: {0}. Must be in [0, 24) hours.")]
    MagneticLocalTime(f64),

    #[error("Invalid region: {0}")]
    Region(String),

    #[error("Invalid {field}: {value}. Must be positive.")]
    NonPositiveSpan { field: &'static str, value: f64 },

    #[error("Flux value cannot be negative: {0}")]
    NegativeFlux(f64),

    #[error("Uncertainty cannot be negative: {0}")]
    NegativeUncertainty(f64),

    #[error("Confidence level must be in (0, 1]: {0}")]
    ConfidenceLevel(f64),

    #[error("Temporal stability must be in [0, 1]: {0}")]
    TemporalStability(f64),

    #[error("Scalar multiplier cannot be negative: {0}")]
    NegativeScalar(f64),

    #[error("Cannot combine fluxes with different units: {left} vs {right}")]
    UnitMismatch { left: String, right: String },

    #[error("Data source cannot be empty")]
    EmptyDataSource,

    #[error("Magnetic field strength cannot be negative: {0}")]
    NegativeFieldStrength(f64),

    #[error("Invalid energy spectrum: {0}")]
    EnergySpectrum(String),

    #[error("Invalid particle type: {0}")]
    ParticleType(String),

    #[error("Inconsistent gradient magnitude. Calculated: {calculated}, provided: {provided}")]
    GradientMagnitude { calculated: f64, provided: f64 },

    #[error("Invalid time range: start must precede end")]
    TimeRange,

    #[error("Anomaly movement too large: {0:.1} km")]
    ExcessiveDisplacement(f64),

    #[error("Cannot merge non-overlapping anomalies")]
    NonOverlapping,

    #[error("Cannot merge anomalies with zero intensity")]
    ZeroIntensity,

    #[error("Anomaly {0} has expired and can no longer be updated")]
    AnomalyExpired(String),

    #[error("Value must be finite: {0}")]
    NonFinite(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_offending_value() {
        let err = ValidationError::Longitude(181.0);
        assert!(err.to_string().contains("181"));

        let err = ValidationError::UnitMismatch {
            left: "particles/cm²/s".to_string(),
            right: "particles/m²/s".to_string(),
        };
        assert!(err.to_string().contains("particles/m²/s"));
    }

    #[test]
    fn test_displacement_message_is_rounded() {
        let err = ValidationError::ExcessiveDisplacement(1234.5678);
        assert_eq!(err.to_string(), "Anomaly movement too large: 1234.6 km");
    }
}
