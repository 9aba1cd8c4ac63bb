//! Shared flux fields and test-double ports for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use saa_manifold::domain::{
    DataQuality, DomainEvent, EnergySpectrum, FluxData, FluxIntensity, GeographicCoordinates,
    GeographicRegion, ParticleType,
};
use saa_manifold::ports::{
    DataAvailability, EventPublisher, FluxDataError, FluxDataPort, PublishError,
    SourceDescription, TemporalResolution, TimeRange,
};

pub const PEAK_LONGITUDE: f64 = -45.0;
pub const PEAK_LATITUDE: f64 = -20.0;
pub const PEAK_ALTITUDE: f64 = 500.0;
pub const PEAK_SIGMA_DEG: f64 = 15.0;
pub const PEAK_AMPLITUDE: f64 = 10_000.0;

pub fn sample(lon: f64, lat: f64, alt: f64, total: f64, quality: DataQuality) -> FluxData {
    FluxData::new(
        GeographicCoordinates::new(lon, lat, alt).unwrap(),
        FluxIntensity::new(total * 0.7, total * 0.7 * 0.05).unwrap(),
        FluxIntensity::new(total * 0.3, total * 0.3 * 0.05).unwrap(),
        Utc::now(),
        quality,
        "fixture",
    )
    .unwrap()
}

pub fn gaussian(lon: f64, lat: f64) -> f64 {
    let dlon = lon - PEAK_LONGITUDE;
    let dlat = lat - PEAK_LATITUDE;
    PEAK_AMPLITUDE * (-(dlon * dlon + dlat * dlat) / (2.0 * PEAK_SIGMA_DEG * PEAK_SIGMA_DEG)).exp()
}

/// Global 5° field with a single Gaussian peak, densely sampled at the peak
///
/// The dense 5x5 patch (0.15° spacing) comes first so that it seeds the
/// cluster around the peak. Detection depends on this sampling density: on
/// a plain grid no outlier cluster is big enough to survive validation (see
/// [`plain_gaussian_grid`]).
pub fn gaussian_peak_field() -> Vec<FluxData> {
    let mut samples = Vec::new();
    for i in -2..=2 {
        for j in -2..=2 {
            let lon = PEAK_LONGITUDE + 0.15 * f64::from(i);
            let lat = PEAK_LATITUDE + 0.15 * f64::from(j);
            samples.push(sample(lon, lat, PEAK_ALTITUDE, gaussian(lon, lat), DataQuality::High));
        }
    }
    for lon_step in 0..72 {
        for lat_step in 0..36 {
            let lon = -177.5 + 5.0 * f64::from(lon_step);
            let lat = -87.5 + 5.0 * f64::from(lat_step);
            samples.push(sample(lon, lat, PEAK_ALTITUDE, gaussian(lon, lat), DataQuality::High));
        }
    }
    samples
}

/// The Gaussian peak sampled on a regular grid, longitude-major order
pub fn plain_gaussian_grid(
    lon_min: f64,
    lat_min: f64,
    lon_steps: u32,
    lat_steps: u32,
    spacing: f64,
) -> Vec<FluxData> {
    let mut samples = Vec::new();
    for i in 0..=lon_steps {
        for j in 0..=lat_steps {
            let lon = lon_min + spacing * f64::from(i);
            let lat = lat_min + spacing * f64::from(j);
            samples.push(sample(lon, lat, PEAK_ALTITUDE, gaussian(lon, lat), DataQuality::High));
        }
    }
    samples
}

pub fn global_region() -> GeographicRegion {
    GeographicRegion::new(-180.0, 180.0, -90.0, 90.0, 200.0, 1000.0).unwrap()
}

pub fn saa_region() -> GeographicRegion {
    GeographicRegion::new(-90.0, 0.0, -50.0, 0.0, 200.0, 1000.0).unwrap()
}

/// Serves a fixed sample set for every region query
pub struct FixedFluxSource {
    samples: Vec<FluxData>,
}

impl FixedFluxSource {
    pub fn new(samples: Vec<FluxData>) -> Self {
        Self { samples }
    }
}

#[async_trait]
impl FluxDataPort for FixedFluxSource {
    async fn get_point(
        &self,
        coordinates: &GeographicCoordinates,
    ) -> Result<Option<FluxData>, FluxDataError> {
        Ok(self
            .samples
            .iter()
            .find(|s| s.location() == coordinates)
            .cloned())
    }

    async fn get_region(
        &self,
        _region: &GeographicRegion,
        _resolution: Option<f64>,
    ) -> Result<Vec<FluxData>, FluxDataError> {
        Ok(self.samples.clone())
    }

    async fn get_history(
        &self,
        _coordinates: &GeographicCoordinates,
        _time_range: &TimeRange,
        _resolution: Option<TemporalResolution>,
    ) -> Result<Vec<FluxData>, FluxDataError> {
        Ok(Vec::new())
    }

    async fn get_energy_spectrum(
        &self,
        _coordinates: &GeographicCoordinates,
        _particle_type: ParticleType,
    ) -> Result<Option<EnergySpectrum>, FluxDataError> {
        Ok(None)
    }

    async fn check_availability(
        &self,
        _region: &GeographicRegion,
        _time_range: Option<&TimeRange>,
    ) -> Result<DataAvailability, FluxDataError> {
        Err(FluxDataError::SourceUnavailable("fixed samples".to_string()))
    }

    async fn describe_source(&self) -> Result<SourceDescription, FluxDataError> {
        Err(FluxDataError::SourceUnavailable("fixed samples".to_string()))
    }
}

/// Records every published event
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DomainEvent::event_type).collect()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Rejects every event
pub struct BrokenPublisher;

#[async_trait]
impl EventPublisher for BrokenPublisher {
    async fn publish(&self, _event: &DomainEvent) -> Result<(), PublishError> {
        Err(PublishError::Unavailable("sink offline".to_string()))
    }
}
