//! The SAA anomaly entity
//!
//! An anomaly is mutated in place by tracking updates and records a domain
//! event for every change. Events are drained by the owner with
//! [`SaaAnomaly::take_events`].

use crate::domain::coordinates::{GeographicCoordinates, SpatialBounds};
use crate::domain::errors::ValidationError;
use crate::domain::events::DomainEvent;
use crate::domain::flux::{ConfidenceLevel, FluxIntensity, TemporalStability};
use crate::domain::identifiers::{AnomalyId, EventId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// Largest plausible centre displacement in one update (km)
pub const MAX_DISPLACEMENT_KM: f64 = 1000.0;
/// Fraction of combined characteristic length below which anomalies overlap
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.1;
/// Scale height for altitude attenuation (km)
const ALTITUDE_SCALE_HEIGHT_KM: f64 = 50.0;
/// Factor applied to the larger characteristic length when merging
const MERGE_EXTENT_GROWTH: f64 = 1.2;
const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// A spatial region with statistically elevated particle flux
#[derive(Debug, Clone, Serialize)]
pub struct SaaAnomaly {
    id: AnomalyId,
    center: GeographicCoordinates,
    intensity_peak: FluxIntensity,
    spatial_extent: SpatialBounds,
    confidence_level: ConfidenceLevel,
    detected_at: DateTime<Utc>,
    temporal_stability: Option<TemporalStability>,
    /// km/year, known after the second position update
    drift_rate: Option<f64>,
    expired_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    last_position_update: Option<DateTime<Utc>>,
    #[serde(skip)]
    pending_events: Vec<DomainEvent>,
}

impl SaaAnomaly {
    pub fn new(
        center: GeographicCoordinates,
        intensity_peak: FluxIntensity,
        spatial_extent: SpatialBounds,
        confidence_level: ConfidenceLevel,
    ) -> Self {
        Self::detected_at(
            center,
            intensity_peak,
            spatial_extent,
            confidence_level,
            Utc::now(),
        )
    }

    /// Create an anomaly with an explicit detection time
    pub fn detected_at(
        center: GeographicCoordinates,
        intensity_peak: FluxIntensity,
        spatial_extent: SpatialBounds,
        confidence_level: ConfidenceLevel,
        detected_at: DateTime<Utc>,
    ) -> Self {
        let id = AnomalyId::generate();
        let detected = DomainEvent::SaaAnomalyDetected {
            event_id: EventId::generate(),
            anomaly_id: id.clone(),
            center_longitude: center.longitude(),
            center_latitude: center.latitude(),
            center_altitude: center.altitude(),
            intensity_peak: intensity_peak.value(),
            detected_at,
        };

        Self {
            id,
            center,
            intensity_peak,
            spatial_extent,
            confidence_level,
            detected_at,
            temporal_stability: None,
            drift_rate: None,
            expired_at: None,
            version: 1,
            last_position_update: None,
            pending_events: vec![detected],
        }
    }

    pub fn with_temporal_stability(mut self, stability: TemporalStability) -> Self {
        self.temporal_stability = Some(stability);
        self
    }

    pub fn id(&self) -> &AnomalyId {
        &self.id
    }

    pub fn center(&self) -> &GeographicCoordinates {
        &self.center
    }

    pub fn intensity_peak(&self) -> &FluxIntensity {
        &self.intensity_peak
    }

    pub fn spatial_extent(&self) -> &SpatialBounds {
        &self.spatial_extent
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    pub fn detection_timestamp(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn temporal_stability(&self) -> Option<TemporalStability> {
        self.temporal_stability
    }

    pub fn drift_rate(&self) -> Option<f64> {
        self.drift_rate
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_expired(&self) -> bool {
        self.expired_at.is_some()
    }

    /// Events recorded since the last drain
    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.pending_events
    }

    /// Drain recorded events for publication
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Modelled flux at a point: Gaussian decay from the centre cut off at
    /// three characteristic lengths, scaled by altitude difference.
    pub fn flux_at_point(
        &self,
        coordinates: &GeographicCoordinates,
    ) -> Result<FluxIntensity, ValidationError> {
        let sigma = self.spatial_extent.characteristic_length();
        let distance = self.center.distance_to(coordinates);
        if distance > sigma * 3.0 {
            return Ok(FluxIntensity::zero(self.intensity_peak.units()));
        }

        let attenuation = (-0.5 * (distance / sigma).powi(2)).exp();
        let factor = attenuation * self.altitude_factor(coordinates.altitude());

        FluxIntensity::with_details(
            self.intensity_peak.value() * factor,
            self.intensity_peak.uncertainty() * factor,
            ConfidenceLevel::parse(self.confidence_level.into_inner() * 0.9)?,
            self.intensity_peak.units(),
        )
    }

    fn altitude_factor(&self, target_altitude: f64) -> f64 {
        let reference = self.center.altitude();
        if target_altitude <= 0.0 || reference <= 0.0 {
            return 0.0;
        }
        (-(target_altitude - reference) / ALTITUDE_SCALE_HEIGHT_KM).exp()
    }

    fn ensure_active(&self) -> Result<(), ValidationError> {
        if self.is_expired() {
            return Err(ValidationError::AnomalyExpired(self.id.to_string()));
        }
        Ok(())
    }

    pub fn update_intensity(&mut self, new_intensity: FluxIntensity) -> Result<(), ValidationError> {
        self.ensure_active()?;

        let old_intensity = self.intensity_peak.value();
        self.intensity_peak = new_intensity;
        self.version += 1;
        self.pending_events
            .push(DomainEvent::SaaAnomalyIntensityChanged {
                event_id: EventId::generate(),
                anomaly_id: self.id.clone(),
                old_intensity,
                new_intensity: new_intensity.value(),
                intensity_change: new_intensity.value() - old_intensity,
                changed_at: Utc::now(),
            });
        Ok(())
    }

    pub fn update_center_position(
        &mut self,
        new_center: GeographicCoordinates,
    ) -> Result<(), ValidationError> {
        self.update_center_position_at(new_center, Utc::now())
    }

    /// Move the centre, recording drift against the previous update time
    pub fn update_center_position_at(
        &mut self,
        new_center: GeographicCoordinates,
        at: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.ensure_active()?;

        let old_center = self.center;
        let distance_moved = old_center.distance_to(&new_center);
        if distance_moved > MAX_DISPLACEMENT_KM {
            return Err(ValidationError::ExcessiveDisplacement(distance_moved));
        }

        if let Some(previous) = self.last_position_update {
            let elapsed_years = (at - previous).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_YEAR;
            if elapsed_years > 0.0 {
                self.drift_rate = Some(distance_moved / elapsed_years);
            }
        }

        self.center = new_center;
        self.last_position_update = Some(at);
        self.version += 1;
        self.pending_events.push(DomainEvent::SaaAnomalyPositionChanged {
            event_id: EventId::generate(),
            anomaly_id: self.id.clone(),
            old_longitude: old_center.longitude(),
            old_latitude: old_center.latitude(),
            old_altitude: old_center.altitude(),
            new_longitude: new_center.longitude(),
            new_latitude: new_center.latitude(),
            new_altitude: new_center.altitude(),
            distance_moved_km: distance_moved,
            changed_at: at,
        });
        Ok(())
    }

    /// Retire an anomaly that is no longer observed
    pub fn expire(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> Result<(), ValidationError> {
        self.ensure_active()?;

        self.expired_at = Some(at);
        self.version += 1;
        self.pending_events.push(DomainEvent::SaaAnomalyExpired {
            event_id: EventId::generate(),
            anomaly_id: self.id.clone(),
            last_detected_at: self.last_position_update.unwrap_or(self.detected_at),
            expired_at: at,
            reason: reason.into(),
        });
        Ok(())
    }

    pub fn is_significant_anomaly(&self, threshold_factor: f64) -> bool {
        self.intensity_peak.is_significant(threshold_factor)
            && self.confidence_level.into_inner() >= 0.9
            && self.spatial_extent.characteristic_length() > 10.0
    }

    pub fn overlaps_with(&self, other: &SaaAnomaly) -> bool {
        self.overlaps_with_threshold(other, DEFAULT_OVERLAP_THRESHOLD)
    }

    pub fn overlaps_with_threshold(&self, other: &SaaAnomaly, overlap_threshold: f64) -> bool {
        let center_distance = self.center.distance_to(&other.center);
        let combined_extent = self.spatial_extent.characteristic_length()
            + other.spatial_extent.characteristic_length();
        center_distance < combined_extent * overlap_threshold
    }

    /// Combine two overlapping anomalies into a new one.
    ///
    /// The centre is the intensity-weighted mean, intensities add with
    /// quadrature uncertainty, spans take the componentwise maximum and the
    /// characteristic length grows to 1.2x the larger of the two.
    pub fn merge_with(&self, other: &SaaAnomaly) -> Result<SaaAnomaly, ValidationError> {
        if !self.overlaps_with(other) {
            return Err(ValidationError::NonOverlapping);
        }

        let w1 = self.intensity_peak.value();
        let w2 = other.intensity_peak.value();
        let total_weight = w1 + w2;
        if total_weight == 0.0 {
            return Err(ValidationError::ZeroIntensity);
        }

        let weighted = |a: f64, b: f64| (w1 * a + w2 * b) / total_weight;
        let center = GeographicCoordinates::new(
            weighted(self.center.longitude(), other.center.longitude()),
            weighted(self.center.latitude(), other.center.latitude()),
            weighted(self.center.altitude(), other.center.altitude()),
        )?;

        let intensity = self.intensity_peak.checked_add(&other.intensity_peak)?;

        let (a, b) = (&self.spatial_extent, &other.spatial_extent);
        let extent = SpatialBounds::new(
            a.longitude_span().max(b.longitude_span()),
            a.latitude_span().max(b.latitude_span()),
            a.altitude_span().max(b.altitude_span()),
            a.characteristic_length().max(b.characteristic_length()) * MERGE_EXTENT_GROWTH,
        )?;

        let confidence = self.confidence_level.min(other.confidence_level);

        let mut merged = SaaAnomaly::new(center, intensity, extent, confidence);
        merged.pending_events.push(DomainEvent::SaaAnomaliesMerged {
            event_id: EventId::generate(),
            original_anomaly_ids: vec![self.id.clone(), other.id.clone()],
            merged_anomaly_id: merged.id.clone(),
            anomalies_count: 2,
            merged_at: Utc::now(),
        });
        Ok(merged)
    }
}

impl PartialEq for SaaAnomaly {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SaaAnomaly {}

impl Hash for SaaAnomaly {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
