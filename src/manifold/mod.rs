//! 3D flux manifold generation
//!
//! Flux samples are interpolated onto a regular grid over the region, a
//! surface mesh is extracted from the significant part of the field and the
//! result is packaged with colour mapping, anomaly markers and metadata.

pub mod grid;
pub mod interpolation;
pub mod output;
pub mod surface;

use crate::detection::statistics::FluxStatistics;
use crate::domain::anomaly::SaaAnomaly;
use crate::domain::coordinates::GeographicRegion;
use crate::domain::errors::ValidationError;
use crate::domain::flux::FluxData;
use chrono::Utc;
use grid::{regular_grid, GridResolution};
use interpolation::{
    nearest_neighbor, single_source_falloff, InterpolationMethod, InterpolationParameters,
    RbfInterpolator,
};
use output::{
    AnomalyMarker, ColorMapping, GenerationParameters, ManifoldData, ManifoldGeometry,
    ManifoldMetadata, Materials,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifoldError {
    #[error("Manifold generation failed: no flux data provided")]
    NoData,

    #[error("Manifold generation failed: grid resolution {0:?} has an empty axis")]
    InvalidResolution(GridResolution),

    #[error("Manifold generation failed: {0}")]
    InvalidFlux(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManifoldParameters {
    pub default_resolution: GridResolution,
    pub interpolation: InterpolationParameters,
    /// Percentile of positive grid flux that marks the surface
    pub surface_percentile: f64,
}

impl Default for ManifoldParameters {
    fn default() -> Self {
        Self {
            default_resolution: GridResolution::default(),
            interpolation: InterpolationParameters::default(),
            surface_percentile: 75.0,
        }
    }
}

/// Builds renderable flux manifolds
#[derive(Debug, Clone, Default)]
pub struct ManifoldBuilder {
    parameters: ManifoldParameters,
}

impl ManifoldBuilder {
    pub fn new(parameters: ManifoldParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &ManifoldParameters {
        &self.parameters
    }

    #[instrument(
        skip(self, samples, anomalies),
        fields(sample_count = samples.len(), anomaly_count = anomalies.len(), region = %region)
    )]
    pub fn build(
        &self,
        samples: &[FluxData],
        region: &GeographicRegion,
        anomalies: &[SaaAnomaly],
        resolution: Option<GridResolution>,
    ) -> Result<ManifoldData, ManifoldError> {
        if samples.is_empty() {
            return Err(ManifoldError::NoData);
        }
        let resolution = resolution.unwrap_or(self.parameters.default_resolution);
        if resolution.has_empty_axis() {
            return Err(ManifoldError::InvalidResolution(resolution));
        }
        info!(?resolution, "Generating flux manifold");

        let centers: Vec<[f64; 3]> = samples.iter().map(|s| s.location().to_array()).collect();
        let totals = samples
            .iter()
            .map(|s| s.total_flux().map(|f| f.value()))
            .collect::<Result<Vec<_>, _>>()?;

        let grid = regular_grid(region, resolution);
        let (flux_values, method) = self.interpolate(&centers, &totals, &grid);
        let mesh = surface::flux_surface(&grid, &flux_values, region, self.parameters.surface_percentile);

        let metadata = ManifoldMetadata {
            generated_at: Utc::now(),
            data_points_used: samples.len(),
            anomalies_included: anomalies.len(),
            grid_resolution: resolution,
            vertex_count: mesh.vertices.len(),
            face_count: mesh.faces.len(),
            flux_statistics: FluxStatistics::from_values(&totals).unwrap_or(FluxStatistics {
                count: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                std_dev: 0.0,
            }),
            generation_parameters: GenerationParameters {
                interpolation_method: method,
                surface_threshold_percentile: self.parameters.surface_percentile,
                rbf_epsilon: self.parameters.interpolation.rbf_epsilon,
                smoothing_factor: self.parameters.interpolation.rbf_smoothing,
            },
        };

        info!(
            vertex_count = metadata.vertex_count,
            face_count = metadata.face_count,
            %method,
            "Manifold generation completed"
        );

        Ok(ManifoldData {
            materials: Materials::new(ColorMapping::from_values(&flux_values)),
            anomaly_markers: anomalies.iter().map(AnomalyMarker::from_anomaly).collect(),
            geometry: ManifoldGeometry {
                vertices: mesh.vertices,
                faces: mesh.faces,
                flux_values,
            },
            metadata,
        })
    }

    fn interpolate(
        &self,
        centers: &[[f64; 3]],
        values: &[f64],
        grid: &[[f64; 3]],
    ) -> (Vec<f64>, InterpolationMethod) {
        let parameters = &self.parameters.interpolation;

        if let ([center], [value]) = (centers, values) {
            let field = single_source_falloff(center, *value, parameters.single_point_falloff, grid);
            return (field, InterpolationMethod::SingleSourceFalloff);
        }

        match RbfInterpolator::fit(centers, values, parameters) {
            Ok(rbf) => (
                grid.iter().map(|p| rbf.evaluate(p)).collect(),
                InterpolationMethod::Rbf,
            ),
            Err(failure) => {
                warn!(%failure, "RBF interpolation failed, using nearest neighbor");
                (
                    nearest_neighbor(centers, values, grid),
                    InterpolationMethod::NearestNeighbor,
                )
            }
        }
    }
}
