//! Coordinate-transform port

use crate::domain::coordinates::{GeographicCoordinates, GeomagneticCoordinates};
use crate::domain::errors::ValidationError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Transformation failed: {0}")]
    Transformation(String),

    #[error("Epoch outside valid model range: {0}")]
    InvalidEpoch(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Field model unavailable: {0}")]
    ModelUnavailable(String),
}

impl From<ValidationError> for TransformError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidCoordinates(err.to_string())
    }
}

/// Magnetic field at a point, in nanotesla and degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MagneticField {
    /// North component
    pub north: f64,
    /// East component
    pub east: f64,
    /// Down component
    pub down: f64,
    pub total: f64,
    pub inclination: f64,
    pub declination: f64,
}

/// Description of the loaded field model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub version: String,
    /// First and last calendar years the model accepts, inclusive
    pub valid_years: (i32, i32),
    pub base_epoch: f64,
    pub available: bool,
}

/// Geographic/geomagnetic conversion and field evaluation
///
/// Every method taking an epoch validates it first; `None` means now.
#[async_trait]
pub trait CoordinateTransformPort: Send + Sync {
    async fn geographic_to_geomagnetic(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<GeomagneticCoordinates, TransformError>;

    async fn geomagnetic_to_geographic(
        &self,
        coordinates: &GeomagneticCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<GeographicCoordinates, TransformError>;

    async fn magnetic_field(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<MagneticField, TransformError>;

    async fn l_shell(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<f64, TransformError>;

    /// Magnetic local time in hours, `[0, 24)`
    async fn magnetic_local_time(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: DateTime<Utc>,
    ) -> Result<f64, TransformError>;

    async fn magnetic_pole_position(
        &self,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<GeographicCoordinates, TransformError>;

    async fn model_info(&self) -> ModelInfo;

    async fn validate_epoch(&self, epoch: DateTime<Utc>) -> bool;
}
