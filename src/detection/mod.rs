//! Statistical anomaly detection over flux samples
//!
//! The pipeline runs in a fixed order: statistical outlier selection, seed
//! distance clustering, cluster-to-anomaly conversion, validation and a
//! single overlap-merge pass.

pub mod clustering;
pub mod statistics;

use crate::domain::anomaly::SaaAnomaly;
use crate::domain::coordinates::{GeographicCoordinates, GeographicRegion, SpatialBounds, KM_PER_DEGREE};
use crate::domain::errors::ValidationError;
use crate::domain::flux::{ConfidenceLevel, FluxData, FluxIntensity};
use clustering::cluster_by_seed_distance;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use statistics::{select_outliers, Candidate, FluxStatistics};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Smallest span recorded for a degenerate cluster axis
const MIN_SPAN: f64 = 1e-6;
/// Peak intensity confidence assigned to cluster-derived anomalies
const PEAK_CONFIDENCE: f64 = 0.95;
const SIGNIFICANCE_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("Anomaly detection failed: non-finite flux statistics (mean {mean}, std {std_dev})")]
    NonFiniteStatistics { mean: f64, std_dev: f64 },

    #[error("Anomaly detection failed: {0}")]
    InvalidFlux(#[from] ValidationError),
}

/// Tunable detection thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParameters {
    /// Standard deviations above the mean for a sample to be an outlier
    pub intensity_threshold_sigma: f64,
    pub minimum_extent_km: f64,
    pub confidence_threshold: f64,
    /// Seed distance for clustering
    pub merge_distance_km: f64,
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            intensity_threshold_sigma: 3.0,
            minimum_extent_km: 50.0,
            confidence_threshold: 0.9,
            merge_distance_km: 100.0,
        }
    }
}

/// Detector parameters and running totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionStatistics {
    pub parameters: DetectionParameters,
    pub analyses_run: u64,
    pub anomalies_reported: u64,
}

/// Finds SAA anomalies in a set of flux samples
///
/// Detection is synchronous and deterministic for a given input order and
/// parameter set.
#[derive(Debug, Default)]
pub struct AnomalyDetector {
    parameters: RwLock<DetectionParameters>,
    analyses_run: AtomicU64,
    anomalies_reported: AtomicU64,
}

impl AnomalyDetector {
    pub fn new(parameters: DetectionParameters) -> Self {
        Self {
            parameters: RwLock::new(parameters),
            analyses_run: AtomicU64::new(0),
            anomalies_reported: AtomicU64::new(0),
        }
    }

    pub fn parameters(&self) -> DetectionParameters {
        *self.parameters.read()
    }

    /// Replace the parameters used by subsequent detections
    pub fn update_parameters(&self, parameters: DetectionParameters) {
        *self.parameters.write() = parameters;
        info!(?parameters, "Anomaly detection parameters updated");
    }

    pub fn statistics(&self) -> DetectionStatistics {
        DetectionStatistics {
            parameters: self.parameters(),
            analyses_run: self.analyses_run.load(Ordering::Relaxed),
            anomalies_reported: self.anomalies_reported.load(Ordering::Relaxed),
        }
    }

    #[instrument(skip(self, samples), fields(sample_count = samples.len(), region = %region))]
    pub fn detect(
        &self,
        samples: &[FluxData],
        region: &GeographicRegion,
    ) -> Result<Vec<SaaAnomaly>, DetectionError> {
        if samples.is_empty() {
            warn!("No flux data provided for anomaly detection");
            return Ok(Vec::new());
        }
        let parameters = self.parameters();
        info!(sample_count = samples.len(), "Starting anomaly detection");

        let candidates = Self::statistical_outliers(samples, &parameters)?;
        debug!(candidate_count = candidates.len(), "Statistical outliers found");

        let clusters = cluster_by_seed_distance(&candidates, parameters.merge_distance_km);
        let mut anomalies = Vec::with_capacity(clusters.len());
        for members in &clusters {
            let cluster: Vec<&Candidate> = members.iter().map(|&i| &candidates[i]).collect();
            if let Some(anomaly) = Self::anomaly_from_cluster(&cluster, samples)? {
                anomalies.push(anomaly);
            }
        }
        debug!(anomaly_count = anomalies.len(), "Clustered into spatial anomalies");

        let validated = Self::validate(anomalies, &parameters);
        debug!(anomaly_count = validated.len(), "Validated anomalies");

        let merged = Self::merge_overlapping(validated)?;
        info!(anomaly_count = merged.len(), "Anomaly detection completed");

        self.analyses_run.fetch_add(1, Ordering::Relaxed);
        self.anomalies_reported
            .fetch_add(merged.len() as u64, Ordering::Relaxed);
        Ok(merged)
    }

    fn statistical_outliers(
        samples: &[FluxData],
        parameters: &DetectionParameters,
    ) -> Result<Vec<Candidate>, DetectionError> {
        let totals = samples
            .iter()
            .map(|s| s.total_flux().map(|f| f.value()))
            .collect::<Result<Vec<_>, _>>()?;
        let locations: Vec<GeographicCoordinates> = samples.iter().map(|s| *s.location()).collect();

        let Some(stats) = FluxStatistics::from_values(&totals) else {
            return Ok(Vec::new());
        };
        if !stats.is_finite() {
            return Err(DetectionError::NonFiniteStatistics {
                mean: stats.mean,
                std_dev: stats.std_dev,
            });
        }

        let threshold = stats.mean + parameters.intensity_threshold_sigma * stats.std_dev;
        debug!(
            threshold,
            mean = stats.mean,
            std_dev = stats.std_dev,
            "Statistical threshold"
        );

        Ok(select_outliers(&totals, &locations, threshold))
    }

    /// Build an anomaly from one cluster; `None` when the cluster is degenerate
    fn anomaly_from_cluster(
        cluster: &[&Candidate],
        samples: &[FluxData],
    ) -> Result<Option<SaaAnomaly>, DetectionError> {
        let Some(seed) = cluster.first() else {
            return Ok(None);
        };

        let total_weight: f64 = cluster.iter().map(|c| c.score).sum();
        if !(total_weight.is_finite() && total_weight > 0.0) {
            debug!(total_weight, "Skipping cluster with no usable weight");
            return Ok(None);
        }

        let weighted = |axis: fn(&GeographicCoordinates) -> f64| {
            cluster.iter().map(|c| c.score * axis(&c.location)).sum::<f64>() / total_weight
        };
        let center = match GeographicCoordinates::new(
            weighted(GeographicCoordinates::longitude),
            weighted(GeographicCoordinates::latitude),
            weighted(GeographicCoordinates::altitude),
        ) {
            Ok(center) => center,
            Err(e) => {
                debug!(error = %e, "Skipping cluster with invalid centroid");
                return Ok(None);
            }
        };

        let max_score = cluster.iter().map(|c| c.score).fold(f64::MIN, f64::max);
        let reference = samples[seed.index].total_flux()?;
        let peak = FluxIntensity::with_details(
            reference.value() * max_score,
            reference.uncertainty() * max_score,
            ConfidenceLevel::parse(PEAK_CONFIDENCE)?,
            reference.units(),
        )?;

        let span = |axis: fn(&GeographicCoordinates) -> f64| {
            let (lo, hi) = cluster
                .iter()
                .map(|c| axis(&c.location))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
            hi - lo
        };
        let lon_span = span(GeographicCoordinates::longitude);
        let lat_span = span(GeographicCoordinates::latitude);
        let alt_span = span(GeographicCoordinates::altitude);
        let characteristic_length = lon_span.hypot(lat_span) * KM_PER_DEGREE;

        let extent = match SpatialBounds::new(
            lon_span.max(MIN_SPAN),
            lat_span.max(MIN_SPAN),
            alt_span.max(MIN_SPAN),
            characteristic_length,
        ) {
            Ok(extent) => extent,
            Err(e) => {
                debug!(cluster_size = cluster.len(), error = %e, "Skipping degenerate cluster");
                return Ok(None);
            }
        };

        let confidence = ConfidenceLevel::parse((0.7 + 0.05 * cluster.len() as f64).min(0.95))?;

        Ok(Some(SaaAnomaly::new(center, peak, extent, confidence)))
    }

    fn validate(anomalies: Vec<SaaAnomaly>, parameters: &DetectionParameters) -> Vec<SaaAnomaly> {
        anomalies
            .into_iter()
            .filter(|anomaly| {
                let length = anomaly.spatial_extent().characteristic_length();
                if length < parameters.minimum_extent_km {
                    debug!(anomaly_id = %anomaly.id(), length, "Rejecting anomaly: extent too small");
                    return false;
                }
                let confidence = anomaly.confidence_level().into_inner();
                if confidence < parameters.confidence_threshold {
                    debug!(anomaly_id = %anomaly.id(), confidence, "Rejecting anomaly: confidence too low");
                    return false;
                }
                if !anomaly.is_significant_anomaly(SIGNIFICANCE_FACTOR) {
                    debug!(anomaly_id = %anomaly.id(), "Rejecting anomaly: not significant");
                    return false;
                }
                true
            })
            .collect()
    }

    /// Single pass: each unmerged anomaly absorbs later ones that overlap the
    /// running merge result.
    fn merge_overlapping(anomalies: Vec<SaaAnomaly>) -> Result<Vec<SaaAnomaly>, DetectionError> {
        if anomalies.len() <= 1 {
            return Ok(anomalies);
        }

        let mut absorbed = vec![false; anomalies.len()];
        let mut merged = Vec::new();

        for i in 0..anomalies.len() {
            if absorbed[i] {
                continue;
            }
            absorbed[i] = true;
            let mut current = anomalies[i].clone();

            for j in (i + 1)..anomalies.len() {
                if absorbed[j] || !current.overlaps_with(&anomalies[j]) {
                    continue;
                }
                debug!(first = %current.id(), second = %anomalies[j].id(), "Merging anomalies");
                current = current.merge_with(&anomalies[j])?;
                absorbed[j] = true;
            }

            merged.push(current);
        }

        Ok(merged)
    }
}
