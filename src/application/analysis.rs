//! SAA analysis orchestration
//!
//! Sequences retrieval, validity filtering, detection and manifold
//! generation for one region, then publishes the resulting events. Every
//! subsystem failure surfaces as [`AnalysisError`].

use crate::detection::{AnomalyDetector, DetectionError};
use crate::domain::anomaly::SaaAnomaly;
use crate::domain::coordinates::GeographicRegion;
use crate::domain::events::{DomainEvent, Severity};
use crate::domain::flux::{FluxData, FluxIntensity};
use crate::domain::identifiers::AnalysisId;
use crate::manifold::grid::GridResolution;
use crate::manifold::output::ManifoldData;
use crate::manifold::{ManifoldBuilder, ManifoldError};
use crate::ports::coordinate_transform::CoordinateTransformPort;
use crate::ports::event_publisher::EventPublisher;
use crate::ports::flux_data::{FluxDataError, FluxDataPort};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_MIN_VALID_FRACTION: f64 = 0.8;
const DEFAULT_DATA_SOURCE: &str = "default";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Analysis failed: no valid flux data for region {region} ({retrieved} samples retrieved)")]
    NoValidData { region: String, retrieved: usize },

    #[error("Analysis failed: flux data retrieval: {0}")]
    Retrieval(#[from] FluxDataError),

    #[error("Analysis failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Analysis failed: {0}")]
    Manifold(#[from] ManifoldError),
}

/// Parameters of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub region: GeographicRegion,
    pub analysis_id: AnalysisId,
    pub data_sources: Option<Vec<String>>,
    /// Retrieval grid spacing in degrees
    pub sample_resolution: Option<f64>,
    pub grid_resolution: Option<GridResolution>,
    pub include_manifold: bool,
}

impl AnalysisRequest {
    pub fn new(region: GeographicRegion) -> Self {
        Self {
            region,
            analysis_id: AnalysisId::generate(),
            data_sources: None,
            sample_resolution: None,
            grid_resolution: None,
            include_manifold: true,
        }
    }

    pub fn with_analysis_id(mut self, analysis_id: AnalysisId) -> Self {
        self.analysis_id = analysis_id;
        self
    }

    pub fn with_data_sources(mut self, data_sources: Vec<String>) -> Self {
        self.data_sources = Some(data_sources);
        self
    }

    pub fn with_sample_resolution(mut self, degrees: f64) -> Self {
        self.sample_resolution = Some(degrees);
        self
    }

    pub fn with_grid_resolution(mut self, resolution: GridResolution) -> Self {
        self.grid_resolution = Some(resolution);
        self
    }

    pub fn without_manifold(mut self) -> Self {
        self.include_manifold = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetadata {
    pub data_points_retrieved: usize,
    pub data_points_processed: usize,
    pub data_sources: Vec<String>,
    pub sample_resolution: Option<f64>,
    pub include_manifold: bool,
    /// Whether the geomagnetic smoke test succeeded
    pub coordinate_transformations: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub analysis_id: AnalysisId,
    pub region: GeographicRegion,
    pub anomalies: Vec<SaaAnomaly>,
    pub manifold: Option<ManifoldData>,
    pub processing_time: Duration,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Anomaly with the highest peak intensity
    pub fn primary_anomaly(&self) -> Option<&SaaAnomaly> {
        self.anomalies.iter().max_by(|a, b| {
            a.intensity_peak()
                .value()
                .total_cmp(&b.intensity_peak().value())
        })
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }

    /// Sum of peak intensities across anomalies
    pub fn total_flux(&self) -> f64 {
        self.anomalies.iter().map(|a| a.intensity_peak().value()).sum()
    }
}

/// Runs SAA analyses against injected data, transform and event ports
pub struct AnalysisOrchestrator {
    flux_data: Arc<dyn FluxDataPort>,
    transformer: Arc<dyn CoordinateTransformPort>,
    publisher: Arc<dyn EventPublisher>,
    detector: AnomalyDetector,
    builder: ManifoldBuilder,
    min_valid_fraction: f64,
}

impl AnalysisOrchestrator {
    pub fn new(
        flux_data: Arc<dyn FluxDataPort>,
        transformer: Arc<dyn CoordinateTransformPort>,
        publisher: Arc<dyn EventPublisher>,
        detector: AnomalyDetector,
        builder: ManifoldBuilder,
    ) -> Self {
        Self {
            flux_data,
            transformer,
            publisher,
            detector,
            builder,
            min_valid_fraction: DEFAULT_MIN_VALID_FRACTION,
        }
    }

    /// Fraction of retrieved samples that must pass validation before a
    /// data quality alert is raised
    pub fn with_min_valid_fraction(mut self, fraction: f64) -> Self {
        self.min_valid_fraction = fraction;
        self
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    #[instrument(skip(self, request), fields(analysis_id = %request.analysis_id, region = %request.region))]
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        info!("Starting SAA analysis");

        let result = self.run(&request, started).await;
        if let Err(e) = &result {
            error!(error = %e, "SAA analysis failed");
        }
        result
    }

    async fn run(&self, request: &AnalysisRequest, started: Instant) -> Result<AnalysisResult, AnalysisError> {
        let region = &request.region;

        debug!("Retrieving flux data");
        let retrieved = self
            .flux_data
            .get_region(region, request.sample_resolution)
            .await?;
        let retrieved_count = retrieved.len();
        let samples: Vec<FluxData> = retrieved.into_iter().filter(is_valid_sample).collect();

        if (samples.len() as f64) < retrieved_count as f64 * self.min_valid_fraction {
            warn!(
                valid = samples.len(),
                retrieved = retrieved_count,
                "Low data quality: too few valid measurements"
            );
            let alert = DomainEvent::data_quality_alert(
                sample_source(&samples, request),
                format!("{}/{} valid measurements", samples.len(), retrieved_count),
                region.to_string(),
                Severity::Medium,
            );
            self.publish(&alert).await;
        }

        if samples.is_empty() {
            return Err(AnalysisError::NoValidData {
                region: region.to_string(),
                retrieved: retrieved_count,
            });
        }

        let coordinate_transformations = self.check_transformer(&samples[0]).await;

        debug!("Detecting SAA anomalies");
        let mut anomalies = self.detector.detect(&samples, region)?;

        let manifold = if request.include_manifold {
            debug!("Generating manifold");
            Some(
                self.builder
                    .build(&samples, region, &anomalies, request.grid_resolution)?,
            )
        } else {
            None
        };

        let processing_time = started.elapsed();

        for anomaly in &mut anomalies {
            for event in anomaly.take_events() {
                self.publish(&event).await;
            }
        }
        let completed = DomainEvent::analysis_completed(
            request.analysis_id.clone(),
            region.to_string(),
            anomalies.len(),
            processing_time.as_secs_f64(),
        );
        self.publish(&completed).await;

        info!(
            anomaly_count = anomalies.len(),
            processing_seconds = processing_time.as_secs_f64(),
            "SAA analysis completed"
        );

        Ok(AnalysisResult {
            analysis_id: request.analysis_id.clone(),
            region: *region,
            metadata: AnalysisMetadata {
                data_points_retrieved: retrieved_count,
                data_points_processed: samples.len(),
                data_sources: request
                    .data_sources
                    .clone()
                    .unwrap_or_else(|| vec![DEFAULT_DATA_SOURCE.to_string()]),
                sample_resolution: request.sample_resolution,
                include_manifold: request.include_manifold,
                coordinate_transformations,
            },
            anomalies,
            manifold,
            processing_time,
        })
    }

    /// One geomagnetic conversion to confirm the transformer is usable
    async fn check_transformer(&self, sample: &FluxData) -> bool {
        match self
            .transformer
            .geographic_to_geomagnetic(sample.location(), None)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Coordinate transformation unavailable");
                false
            }
        }
    }

    async fn publish(&self, event: &DomainEvent) {
        if let Err(e) = self.publisher.publish(event).await {
            warn!(event_type = event.event_type(), error = %e, "Failed to publish event");
        }
    }
}

/// Non-negative flux and uncertainty with usable quality
fn is_valid_sample(sample: &FluxData) -> bool {
    let non_negative = |f: &FluxIntensity| f.value() >= 0.0 && f.uncertainty() >= 0.0;
    non_negative(sample.electron_flux())
        && non_negative(sample.proton_flux())
        && sample.data_quality().is_usable()
}

fn sample_source(samples: &[FluxData], request: &AnalysisRequest) -> String {
    samples
        .first()
        .map(|s| s.data_source().to_string())
        .or_else(|| request.data_sources.as_ref().and_then(|d| d.first().cloned()))
        .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string())
}
