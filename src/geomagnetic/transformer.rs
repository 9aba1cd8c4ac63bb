//! Centred-dipole coordinate transformer
//!
//! Geographic and geomagnetic frames are related by a rotation that carries
//! the (drifting) magnetic north pole onto the z axis. Field values use the
//! axial dipole term only.

use crate::domain::coordinates::{GeographicCoordinates, GeomagneticCoordinates};
use crate::geomagnetic::coefficients::{CoefficientModel, DipoleCoefficients};
use crate::ports::coordinate_transform::{
    CoordinateTransformPort, MagneticField, ModelInfo, TransformError,
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use std::path::Path;
use tracing::{debug, error, info, instrument};

/// Reference radius of the field model (km)
pub const MODEL_EARTH_RADIUS_KM: f64 = 6371.2;
pub const FIRST_VALID_YEAR: i32 = 1900;
pub const LAST_VALID_YEAR: i32 = 2030;

const MODEL_NAME: &str = "IGRF-13 dipole";
const MODEL_VERSION: &str = "13";

/// Magnetic north pole at the base epoch (degrees)
const BASE_POLE_LATITUDE: f64 = 86.5;
const BASE_POLE_LONGITUDE: f64 = -164.0;
/// Pole drift (degrees/year)
const POLE_LATITUDE_DRIFT: f64 = -0.1;
const POLE_LONGITUDE_DRIFT: f64 = 10.0;

/// Magnetic latitude beyond which magnetic longitude is undefined
const POLAR_LATITUDE_LIMIT: f64 = 89.9;
/// L-shell reported where cos(magnetic latitude) vanishes
const POLAR_L_SHELL: f64 = 100.0;
const MIN_INVERSE_ALTITUDE_KM: f64 = 100.0;
const DEGREES_PER_HOUR: f64 = 15.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Wrap a longitude into `[-180, 180)`
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

/// Calendar year with the elapsed fraction of that year
pub fn decimal_year(epoch: DateTime<Utc>) -> f64 {
    let year = epoch.year();
    let days_in_year = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    let day = f64::from(epoch.ordinal0()) + f64::from(epoch.num_seconds_from_midnight()) / 86_400.0;
    f64::from(year) + day / days_in_year
}

fn unit_vector(longitude: f64, latitude: f64) -> [f64; 3] {
    let (lon, lat) = (longitude.to_radians(), latitude.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn angles_of(v: [f64; 3]) -> (f64, f64) {
    let latitude = v[2].clamp(-1.0, 1.0).asin().to_degrees();
    let longitude = v[1].atan2(v[0]).to_degrees();
    (longitude, latitude)
}

/// Magnetic north pole position used for the frame rotation
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pole {
    longitude: f64,
    latitude: f64,
}

impl Pole {
    fn at_year(year: f64, base_epoch: f64) -> Self {
        let years = year - base_epoch;
        Self {
            longitude: normalize_longitude(BASE_POLE_LONGITUDE + POLE_LONGITUDE_DRIFT * years),
            latitude: (BASE_POLE_LATITUDE + POLE_LATITUDE_DRIFT * years).clamp(-90.0, 90.0),
        }
    }

    /// Rotate a geographic unit vector into the magnetic frame
    fn to_magnetic(self, v: [f64; 3]) -> [f64; 3] {
        let (sin_l, cos_l) = self.longitude.to_radians().sin_cos();
        let (sin_t, cos_t) = (90.0 - self.latitude).to_radians().sin_cos();
        let x1 = cos_l * v[0] + sin_l * v[1];
        let y1 = -sin_l * v[0] + cos_l * v[1];
        [cos_t * x1 - sin_t * v[2], y1, sin_t * x1 + cos_t * v[2]]
    }

    fn to_geographic(self, v: [f64; 3]) -> [f64; 3] {
        let (sin_l, cos_l) = self.longitude.to_radians().sin_cos();
        let (sin_t, cos_t) = (90.0 - self.latitude).to_radians().sin_cos();
        let x1 = cos_t * v[0] + sin_t * v[2];
        let z1 = -sin_t * v[0] + cos_t * v[2];
        [cos_l * x1 - sin_l * v[1], sin_l * x1 + cos_l * v[1], z1]
    }
}

/// Dipole transformer over a linearly varying coefficient set
///
/// A transformer constructed from an unreadable coefficient file stays
/// usable as a value but fails every computation with `ModelUnavailable`.
#[derive(Debug, Clone)]
pub struct DipoleTransformer {
    model: Option<CoefficientModel>,
}

impl DipoleTransformer {
    pub fn new() -> Self {
        Self::from_coefficients(CoefficientModel::igrf13())
    }

    pub fn from_coefficients(model: CoefficientModel) -> Self {
        Self { model: Some(model) }
    }

    /// Load coefficients from a JSON file; on failure the model is unavailable
    pub fn from_file(path: &Path) -> Self {
        match CoefficientModel::load(path) {
            Ok(model) => {
                info!(path = %path.display(), "Dipole coefficients loaded");
                Self::from_coefficients(model)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load dipole coefficients");
                Self { model: None }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn is_valid_epoch(&self, epoch: DateTime<Utc>) -> bool {
        (FIRST_VALID_YEAR..=LAST_VALID_YEAR).contains(&epoch.year())
    }

    /// Model availability and epoch checks shared by every entry point
    fn prepare(&self, epoch: DateTime<Utc>) -> Result<(CoefficientModel, f64), TransformError> {
        let model = self.model.ok_or_else(|| {
            TransformError::ModelUnavailable("dipole coefficients are not loaded".to_string())
        })?;
        if !self.is_valid_epoch(epoch) {
            return Err(TransformError::InvalidEpoch(format!(
                "{} is outside {FIRST_VALID_YEAR}-{LAST_VALID_YEAR}",
                epoch.date_naive()
            )));
        }
        Ok((model, decimal_year(epoch)))
    }

    fn coefficients(model: &CoefficientModel, year: f64) -> Result<DipoleCoefficients, TransformError> {
        let coefficients = model.at_year(year);
        if !coefficients.is_finite() {
            return Err(TransformError::Transformation(format!(
                "non-finite dipole coefficients at {year:.3}"
            )));
        }
        Ok(coefficients)
    }

    /// Magnetic (longitude, latitude) of a geographic point
    fn magnetic_angles(pole: Pole, coordinates: &GeographicCoordinates) -> (f64, f64) {
        let v = pole.to_magnetic(unit_vector(coordinates.longitude(), coordinates.latitude()));
        let (longitude, latitude) = angles_of(v);
        if latitude.abs() >= POLAR_LATITUDE_LIMIT {
            (0.0, latitude)
        } else {
            (normalize_longitude(longitude), latitude)
        }
    }

    fn l_shell_for(magnetic_latitude: f64, altitude: f64) -> f64 {
        let cos_lat = magnetic_latitude.to_radians().cos();
        if cos_lat.abs() < 0.01 {
            return POLAR_L_SHELL;
        }
        let r = (altitude + MODEL_EARTH_RADIUS_KM) / MODEL_EARTH_RADIUS_KM;
        (r / (cos_lat * cos_lat)).max(1.0)
    }

    fn magnetic_local_time_for(magnetic_longitude: f64, pole: Pole, epoch: DateTime<Utc>) -> f64 {
        let solar_longitude = f64::from(epoch.ordinal()) / DAYS_PER_YEAR * 360.0;
        let mlt = ((magnetic_longitude - solar_longitude + pole.longitude) / DEGREES_PER_HOUR)
            .rem_euclid(24.0);
        if mlt >= 24.0 {
            0.0
        } else {
            mlt
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub fn to_geomagnetic(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: DateTime<Utc>,
    ) -> Result<GeomagneticCoordinates, TransformError> {
        let (model, year) = self.prepare(epoch)?;
        Self::coefficients(&model, year)?;
        let pole = Pole::at_year(year, model.base_epoch);

        let (magnetic_longitude, magnetic_latitude) = Self::magnetic_angles(pole, coordinates);
        let l_shell = Self::l_shell_for(magnetic_latitude, coordinates.altitude());
        let mlt = Self::magnetic_local_time_for(magnetic_longitude, pole, epoch);

        GeomagneticCoordinates::new(magnetic_longitude, magnetic_latitude, l_shell, mlt)
            .map_err(|e| TransformError::Transformation(e.to_string()))
    }

    /// Inverse rotation; altitude is estimated from the L-shell
    #[instrument(skip(self), level = "debug")]
    pub fn to_geographic(
        &self,
        coordinates: &GeomagneticCoordinates,
        epoch: DateTime<Utc>,
    ) -> Result<GeographicCoordinates, TransformError> {
        let (model, year) = self.prepare(epoch)?;
        Self::coefficients(&model, year)?;
        let pole = Pole::at_year(year, model.base_epoch);

        let v = pole.to_geographic(unit_vector(
            coordinates.magnetic_longitude(),
            coordinates.magnetic_latitude(),
        ));
        let (longitude, latitude) = angles_of(v);
        let longitude = if latitude.abs() >= POLAR_LATITUDE_LIMIT {
            pole.longitude
        } else {
            normalize_longitude(longitude)
        };
        let altitude = ((coordinates.l_shell() - 1.0) * MODEL_EARTH_RADIUS_KM).max(MIN_INVERSE_ALTITUDE_KM);

        GeographicCoordinates::new(longitude, latitude, altitude)
            .map_err(|e| TransformError::Transformation(e.to_string()))
    }

    /// Axial dipole field in the local North/East/Down frame
    pub fn magnetic_field(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: DateTime<Utc>,
    ) -> Result<MagneticField, TransformError> {
        let (model, year) = self.prepare(epoch)?;
        let g10 = Self::coefficients(&model, year)?.g10;

        let r = coordinates.altitude() + MODEL_EARTH_RADIUS_KM;
        let theta = (90.0 - coordinates.latitude()).to_radians();
        let falloff = (MODEL_EARTH_RADIUS_KM / r).powi(3);

        let b_r = 2.0 * g10 * falloff * theta.cos();
        let b_theta = g10 * falloff * theta.sin();

        let north = -b_theta;
        let east = 0.0;
        let down = -b_r;
        let horizontal = north.hypot(east);

        let field = MagneticField {
            north,
            east,
            down,
            total: horizontal.hypot(down),
            inclination: down.atan2(horizontal).to_degrees(),
            declination: east.atan2(north).to_degrees(),
        };
        if !field.total.is_finite() {
            return Err(TransformError::Transformation(
                "field evaluation produced a non-finite value".to_string(),
            ));
        }
        Ok(field)
    }

    pub fn l_shell(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: DateTime<Utc>,
    ) -> Result<f64, TransformError> {
        Ok(self.to_geomagnetic(coordinates, epoch)?.l_shell())
    }

    pub fn magnetic_local_time(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: DateTime<Utc>,
    ) -> Result<f64, TransformError> {
        Ok(self.to_geomagnetic(coordinates, epoch)?.magnetic_local_time())
    }

    pub fn magnetic_pole_position(
        &self,
        epoch: DateTime<Utc>,
    ) -> Result<GeographicCoordinates, TransformError> {
        let (model, year) = self.prepare(epoch)?;
        let pole = Pole::at_year(year, model.base_epoch);
        debug!(year, longitude = pole.longitude, latitude = pole.latitude, "Magnetic pole position");
        Ok(GeographicCoordinates::new(pole.longitude, pole.latitude, 0.0)?)
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_name: MODEL_NAME.to_string(),
            version: MODEL_VERSION.to_string(),
            valid_years: (FIRST_VALID_YEAR, LAST_VALID_YEAR),
            base_epoch: self.model.map_or(0.0, |m| m.base_epoch),
            available: self.is_available(),
        }
    }
}

impl Default for DipoleTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinateTransformPort for DipoleTransformer {
    async fn geographic_to_geomagnetic(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<GeomagneticCoordinates, TransformError> {
        self.to_geomagnetic(coordinates, epoch.unwrap_or_else(Utc::now))
    }

    async fn geomagnetic_to_geographic(
        &self,
        coordinates: &GeomagneticCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<GeographicCoordinates, TransformError> {
        self.to_geographic(coordinates, epoch.unwrap_or_else(Utc::now))
    }

    async fn magnetic_field(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<MagneticField, TransformError> {
        DipoleTransformer::magnetic_field(self, coordinates, epoch.unwrap_or_else(Utc::now))
    }

    async fn l_shell(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<f64, TransformError> {
        DipoleTransformer::l_shell(self, coordinates, epoch.unwrap_or_else(Utc::now))
    }

    async fn magnetic_local_time(
        &self,
        coordinates: &GeographicCoordinates,
        epoch: DateTime<Utc>,
    ) -> Result<f64, TransformError> {
        DipoleTransformer::magnetic_local_time(self, coordinates, epoch)
    }

    async fn magnetic_pole_position(
        &self,
        epoch: Option<DateTime<Utc>>,
    ) -> Result<GeographicCoordinates, TransformError> {
        DipoleTransformer::magnetic_pole_position(self, epoch.unwrap_or_else(Utc::now))
    }

    async fn model_info(&self) -> ModelInfo {
        DipoleTransformer::model_info(self)
    }

    async fn validate_epoch(&self, epoch: DateTime<Utc>) -> bool {
        self.is_valid_epoch(epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn epoch(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn point(lon: f64, lat: f64, alt: f64) -> GeographicCoordinates {
        GeographicCoordinates::new(lon, lat, alt).unwrap()
    }

    #[rstest]
    #[case(epoch(1899, 12, 31), false)]
    #[case(epoch(1900, 1, 1), true)]
    #[case(epoch(2020, 6, 15), true)]
    #[case(epoch(2030, 12, 31), true)]
    #[case(epoch(2031, 1, 1), false)]
    fn test_epoch_validation(#[case] at: DateTime<Utc>, #[case] valid: bool) {
        assert_eq!(DipoleTransformer::new().is_valid_epoch(at), valid);
    }

    #[test]
    fn test_invalid_epoch_rejected_by_every_entry_point() {
        let transformer = DipoleTransformer::new();
        let at = epoch(2031, 1, 1);
        let p = point(-45.0, -20.0, 500.0);

        assert!(matches!(transformer.to_geomagnetic(&p, at), Err(TransformError::InvalidEpoch(_))));
        assert!(matches!(transformer.magnetic_field(&p, at), Err(TransformError::InvalidEpoch(_))));
        assert!(matches!(transformer.l_shell(&p, at), Err(TransformError::InvalidEpoch(_))));
        assert!(matches!(
            transformer.magnetic_pole_position(at),
            Err(TransformError::InvalidEpoch(_))
        ));
        let magnetic = GeomagneticCoordinates::new(10.0, 10.0, 1.2, 3.0).unwrap();
        assert!(matches!(
            transformer.to_geographic(&magnetic, at),
            Err(TransformError::InvalidEpoch(_))
        ));
    }

    #[test]
    fn test_decimal_year() {
        assert_eq!(decimal_year(epoch(2020, 1, 1)), 2020.0);
        let mid = decimal_year(Utc.with_ymd_and_hms(2021, 7, 2, 12, 0, 0).unwrap());
        assert!((mid - 2021.5).abs() < 1e-9);
    }

    #[test]
    fn test_pole_position_drifts_linearly() {
        let transformer = DipoleTransformer::new();

        let base = transformer.magnetic_pole_position(epoch(2020, 1, 1)).unwrap();
        assert_eq!(base.longitude(), -164.0);
        assert_eq!(base.latitude(), 86.5);

        let later = transformer.magnetic_pole_position(epoch(2025, 1, 1)).unwrap();
        assert!((later.latitude() - 86.0).abs() < 1e-3);
        assert!((later.longitude() - (-114.0)).abs() < 0.1);
    }

    #[rstest]
    #[case(-45.0, -20.0)]
    #[case(120.0, 35.0)]
    #[case(0.0, 0.0)]
    #[case(-170.0, 60.0)]
    fn test_round_trip_recovers_position(#[case] lon: f64, #[case] lat: f64) {
        let transformer = DipoleTransformer::new();
        let at = epoch(2020, 3, 1);
        let original = point(lon, lat, 500.0);

        let magnetic = transformer.to_geomagnetic(&original, at).unwrap();
        let recovered = transformer.to_geographic(&magnetic, at).unwrap();

        assert!((recovered.longitude() - lon).abs() < 1e-9);
        assert!((recovered.latitude() - lat).abs() < 1e-9);
    }

    #[test]
    fn test_magnetic_pole_maps_to_polar_fallback() {
        let transformer = DipoleTransformer::new();
        let at = epoch(2020, 1, 1);

        let magnetic = transformer.to_geomagnetic(&point(-164.0, 86.5, 0.0), at).unwrap();

        assert!(magnetic.magnetic_latitude() > 89.9);
        assert_eq!(magnetic.magnetic_longitude(), 0.0);
        assert_eq!(magnetic.l_shell(), 100.0);
    }

    #[test]
    fn test_l_shell_follows_dipole_approximation() {
        let transformer = DipoleTransformer::new();
        let at = epoch(2020, 1, 1);
        let p = point(-45.0, -20.0, 637.12);

        let magnetic = transformer.to_geomagnetic(&p, at).unwrap();
        let cos_lat = magnetic.magnetic_latitude().to_radians().cos();
        let expected = 1.1 / (cos_lat * cos_lat);

        assert!((magnetic.l_shell() - expected).abs() < 1e-9);
        assert!(magnetic.l_shell() >= 1.0);
    }

    #[test]
    fn test_magnetic_local_time_in_range() {
        let transformer = DipoleTransformer::new();
        for day in [1, 90, 180, 270, 365] {
            let at = epoch(2021, 1, 1) + chrono::Duration::days(day - 1);
            for lon in [-180.0, -90.0, 0.0, 90.0, 179.0] {
                let mlt = transformer.magnetic_local_time(&point(lon, 10.0, 400.0), at).unwrap();
                assert!((0.0..24.0).contains(&mlt), "mlt {mlt} out of range");
            }
        }
    }

    #[test]
    fn test_dipole_field_at_equator_and_pole() {
        let transformer = DipoleTransformer::new();
        let at = epoch(2020, 1, 1);

        let equator = transformer.magnetic_field(&point(0.0, 0.0, 0.0), at).unwrap();
        assert!((equator.north - 29442.0).abs() < 1e-6);
        assert!(equator.down.abs() < 1e-6);
        assert!(equator.inclination.abs() < 1e-9);
        assert_eq!(equator.declination, 0.0);

        let pole = transformer.magnetic_field(&point(0.0, 90.0, 0.0), at).unwrap();
        assert!((pole.down - 58884.0).abs() < 1e-6);
        assert!((pole.total - 58884.0).abs() < 1e-6);
        assert!((pole.inclination - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_field_weakens_with_altitude() {
        let transformer = DipoleTransformer::new();
        let at = epoch(2020, 1, 1);
        let surface = transformer.magnetic_field(&point(-45.0, -20.0, 0.0), at).unwrap();
        let orbit = transformer.magnetic_field(&point(-45.0, -20.0, 6371.2), at).unwrap();
        assert!((orbit.total * 8.0 - surface.total).abs() < 1e-6);
    }

    #[test]
    fn test_unavailable_model_fails_every_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let transformer = DipoleTransformer::from_file(&dir.path().join("igrf.json"));
        let at = epoch(2020, 1, 1);
        let p = point(-45.0, -20.0, 500.0);

        assert!(!transformer.model_info().available);
        assert!(matches!(
            transformer.to_geomagnetic(&p, at),
            Err(TransformError::ModelUnavailable(_))
        ));
        assert!(matches!(
            transformer.magnetic_field(&p, at),
            Err(TransformError::ModelUnavailable(_))
        ));
        assert!(matches!(
            transformer.magnetic_pole_position(at),
            Err(TransformError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_malformed_coefficients_fail_transformation() {
        let mut model = CoefficientModel::igrf13();
        model.main_field.g10 = f64::NAN;
        let transformer = DipoleTransformer::from_coefficients(model);

        let result = transformer.magnetic_field(&point(0.0, 0.0, 0.0), epoch(2020, 1, 1));
        assert!(matches!(result, Err(TransformError::Transformation(_))));
    }

    #[test]
    fn test_model_info_reports_range() {
        let info = DipoleTransformer::new().model_info();
        assert_eq!(info.valid_years, (1900, 2030));
        assert_eq!(info.base_epoch, 2020.0);
        assert!(info.available);
    }

    #[tokio::test]
    async fn test_port_defaults_epoch_to_now() {
        let transformer: &dyn CoordinateTransformPort = &DipoleTransformer::new();
        let magnetic = transformer
            .geographic_to_geomagnetic(&point(-45.0, -20.0, 500.0), None)
            .await
            .unwrap();
        assert!(magnetic.l_shell() >= 1.0);
        assert!(transformer.validate_epoch(Utc::now()).await);
    }
}
