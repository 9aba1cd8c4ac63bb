//! Flux-data access port

use crate::domain::coordinates::{GeographicCoordinates, GeographicRegion};
use crate::domain::errors::ValidationError;
use crate::domain::flux::{DataQuality, EnergySpectrum, FluxData, ParticleType};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by flux-data sources
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FluxDataError {
    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Coordinates outside data coverage: {0}")]
    InvalidCoordinates(String),

    #[error("Region too large: {0}")]
    RegionTooLarge(String),

    #[error("Invalid time range: {0}")]
    TimeRange(String),

    #[error("Unsupported particle type: {0}")]
    InvalidParticleType(String),

    #[error("Source produced invalid data: {0}")]
    InvalidData(#[from] ValidationError),
}

/// Closed time interval with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::TimeRange);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Sampling interval for historical series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum TemporalResolution {
    #[display("hourly")]
    Hourly,
    #[default]
    #[display("daily")]
    Daily,
    #[display("monthly")]
    Monthly,
    #[display("yearly")]
    Yearly,
}

impl TemporalResolution {
    /// Nominal step between samples
    pub fn step(&self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::Daily => Duration::days(1),
            Self::Monthly => Duration::days(30),
            Self::Yearly => Duration::days(365),
        }
    }
}

/// Coverage report for a region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAvailability {
    pub coverage_percentage: f64,
    pub data_quality: DataQuality,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    pub missing_regions: Vec<GeographicRegion>,
    pub data_sources: Vec<String>,
}

/// Descriptive metadata for a data source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDescription {
    pub source_name: String,
    pub version: String,
    pub description: String,
    pub coverage: String,
    pub last_updated: DateTime<Utc>,
    pub data_quality: DataQuality,
}

/// Access to particle-flux measurements or model evaluations
#[async_trait]
pub trait FluxDataPort: Send + Sync {
    /// Flux at a single point, `None` when the source has no data there
    async fn get_point(
        &self,
        coordinates: &GeographicCoordinates,
    ) -> Result<Option<FluxData>, FluxDataError>;

    /// All samples on a grid covering `region`; `resolution` is in degrees
    async fn get_region(
        &self,
        region: &GeographicRegion,
        resolution: Option<f64>,
    ) -> Result<Vec<FluxData>, FluxDataError>;

    async fn get_history(
        &self,
        coordinates: &GeographicCoordinates,
        time_range: &TimeRange,
        resolution: Option<TemporalResolution>,
    ) -> Result<Vec<FluxData>, FluxDataError>;

    async fn get_energy_spectrum(
        &self,
        coordinates: &GeographicCoordinates,
        particle_type: ParticleType,
    ) -> Result<Option<EnergySpectrum>, FluxDataError>;

    async fn check_availability(
        &self,
        region: &GeographicRegion,
        time_range: Option<&TimeRange>,
    ) -> Result<DataAvailability, FluxDataError>;

    async fn describe_source(&self) -> Result<SourceDescription, FluxDataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_requires_ordered_bounds() {
        let now = Utc::now();
        assert!(TimeRange::new(now, now + Duration::days(1)).is_ok());
        assert_eq!(TimeRange::new(now, now), Err(ValidationError::TimeRange));
        assert!(TimeRange::new(now, now - Duration::days(1)).is_err());
    }

    #[test]
    fn test_temporal_resolution_steps() {
        assert_eq!(TemporalResolution::default(), TemporalResolution::Daily);
        assert_eq!(TemporalResolution::Hourly.step(), Duration::hours(1));
        assert_eq!(TemporalResolution::Yearly.step(), Duration::days(365));
    }

    #[test]
    fn test_error_wraps_validation_failure() {
        let err: FluxDataError = ValidationError::NegativeFlux(-1.0).into();
        assert!(err.to_string().contains("negative"));
    }
}
