//! Rendering-ready manifold description

use crate::detection::statistics::FluxStatistics;
use crate::domain::anomaly::SaaAnomaly;
use crate::domain::identifiers::AnomalyId;
use crate::manifold::grid::GridResolution;
use crate::manifold::interpolation::InterpolationMethod;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_COLOR_SCALE: &str = "plasma";
pub const DEFAULT_OPACITY: f64 = 0.8;

const HIGH_INTENSITY: f64 = 2000.0;
const MEDIUM_INTENSITY: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifoldData {
    pub geometry: ManifoldGeometry,
    pub materials: Materials,
    pub anomaly_markers: Vec<AnomalyMarker>,
    pub metadata: ManifoldMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifoldGeometry {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[usize; 3]>,
    /// Interpolated flux at every grid point, in grid order
    pub flux_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Materials {
    pub color_mapping: ColorMapping,
    pub opacity: f64,
    pub wireframe: bool,
}

impl Materials {
    pub fn new(color_mapping: ColorMapping) -> Self {
        Self {
            color_mapping,
            opacity: DEFAULT_OPACITY,
            wireframe: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorMapping {
    pub min_value: f64,
    pub max_value: f64,
    pub color_scale: String,
    pub scale_type: ScaleType,
}

impl ColorMapping {
    /// Range of the positive values, `[0, 1]` when there are none
    pub fn from_values(values: &[f64]) -> Self {
        let (min_value, max_value) = values
            .iter()
            .copied()
            .filter(|v| *v > 0.0)
            .fold(None, |range: Option<(f64, f64)>, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 1.0));

        Self {
            min_value,
            max_value,
            color_scale: DEFAULT_COLOR_SCALE.to_string(),
            scale_type: ScaleType::Linear,
        }
    }
}

/// Display marker for one detected anomaly
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyMarker {
    pub id: AnomalyId,
    pub position: [f64; 3],
    pub intensity: f64,
    pub confidence: f64,
    /// Characteristic length (km)
    pub radius: f64,
    pub color: String,
    pub label: String,
}

impl AnomalyMarker {
    pub fn from_anomaly(anomaly: &SaaAnomaly) -> Self {
        let intensity = anomaly.intensity_peak().value();
        Self {
            id: anomaly.id().clone(),
            position: anomaly.center().to_array(),
            intensity,
            confidence: anomaly.confidence_level().into_inner(),
            radius: anomaly.spatial_extent().characteristic_length(),
            color: marker_color(intensity).to_string(),
            label: format!("SAA-{}", anomaly.id().short()),
        }
    }
}

/// Marker colour banded by peak intensity
pub fn marker_color(intensity: f64) -> &'static str {
    if intensity > HIGH_INTENSITY {
        "#ff0000"
    } else if intensity > MEDIUM_INTENSITY {
        "#ff8800"
    } else {
        "#ffff00"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParameters {
    pub interpolation_method: InterpolationMethod,
    pub surface_threshold_percentile: f64,
    pub rbf_epsilon: f64,
    pub smoothing_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifoldMetadata {
    pub generated_at: DateTime<Utc>,
    pub data_points_used: usize,
    pub anomalies_included: usize,
    pub grid_resolution: GridResolution,
    pub vertex_count: usize,
    pub face_count: usize,
    /// Summary of the input samples' total flux
    pub flux_statistics: FluxStatistics,
    pub generation_parameters: GenerationParameters,
}
