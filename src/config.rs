use crate::detection::DetectionParameters;
use crate::error::Result;
use crate::infrastructure::synthetic_flux::RetrievalLimits;
use crate::manifold::grid::GridResolution;
use crate::manifold::interpolation::InterpolationParameters;
use crate::manifold::ManifoldParameters;
pub use config::ConfigError;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SAA_MANIFOLD";

/// Runtime settings; `Default` gives the built-in values without reading
/// files or the environment
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Settings {
    pub detection: DetectionParameters,
    pub manifold: ManifoldSettings,
    pub retrieval: RetrievalLimits,
    #[serde(default)]
    pub geomagnetic: GeomagneticSettings,
    pub analysis: AnalysisSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ManifoldSettings {
    pub grid_longitude: usize,
    pub grid_latitude: usize,
    pub grid_altitude: usize,
    pub rbf_epsilon: f64,
    pub rbf_smoothing: f64,
    pub surface_percentile: f64,
    pub single_point_falloff: f64,
    pub max_rbf_samples: usize,
}

impl ManifoldSettings {
    pub fn parameters(&self) -> ManifoldParameters {
        ManifoldParameters {
            default_resolution: GridResolution::new(
                self.grid_longitude,
                self.grid_latitude,
                self.grid_altitude,
            ),
            interpolation: InterpolationParameters {
                rbf_epsilon: self.rbf_epsilon,
                rbf_smoothing: self.rbf_smoothing,
                max_rbf_samples: self.max_rbf_samples,
                single_point_falloff: self.single_point_falloff,
            },
            surface_percentile: self.surface_percentile,
        }
    }
}

impl Default for ManifoldSettings {
    fn default() -> Self {
        let parameters = ManifoldParameters::default();
        Self {
            grid_longitude: parameters.default_resolution.longitude,
            grid_latitude: parameters.default_resolution.latitude,
            grid_altitude: parameters.default_resolution.altitude,
            rbf_epsilon: parameters.interpolation.rbf_epsilon,
            rbf_smoothing: parameters.interpolation.rbf_smoothing,
            surface_percentile: parameters.surface_percentile,
            single_point_falloff: parameters.interpolation.single_point_falloff,
            max_rbf_samples: parameters.interpolation.max_rbf_samples,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct GeomagneticSettings {
    /// JSON dipole coefficient file; built-in coefficients when absent
    pub coefficients_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub min_valid_fraction: f64,
    /// Retrieval spacing in degrees for requests made by the binary
    pub sample_resolution: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            min_valid_fraction: 0.8,
            sample_resolution: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `config/` files, then `SAA_MANIFOLD__*` variables
    pub fn new() -> Result<Self> {
        Self::load(Path::new("config"))
    }

    pub fn load(config_dir: &Path) -> Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let defaults = Self::default();

        let config = Config::builder()
            .set_default("detection.intensity_threshold_sigma", defaults.detection.intensity_threshold_sigma)?
            .set_default("detection.minimum_extent_km", defaults.detection.minimum_extent_km)?
            .set_default("detection.confidence_threshold", defaults.detection.confidence_threshold)?
            .set_default("detection.merge_distance_km", defaults.detection.merge_distance_km)?
            .set_default("manifold.grid_longitude", defaults.manifold.grid_longitude as i64)?
            .set_default("manifold.grid_latitude", defaults.manifold.grid_latitude as i64)?
            .set_default("manifold.grid_altitude", defaults.manifold.grid_altitude as i64)?
            .set_default("manifold.rbf_epsilon", defaults.manifold.rbf_epsilon)?
            .set_default("manifold.rbf_smoothing", defaults.manifold.rbf_smoothing)?
            .set_default("manifold.surface_percentile", defaults.manifold.surface_percentile)?
            .set_default("manifold.single_point_falloff", defaults.manifold.single_point_falloff)?
            .set_default("manifold.max_rbf_samples", defaults.manifold.max_rbf_samples as i64)?
            .set_default("retrieval.default_resolution", defaults.retrieval.default_resolution)?
            .set_default("retrieval.batch_size", defaults.retrieval.batch_size as i64)?
            .set_default("retrieval.max_longitude_span", defaults.retrieval.max_longitude_span)?
            .set_default("retrieval.max_latitude_span", defaults.retrieval.max_latitude_span)?
            .set_default("retrieval.max_grid_points", defaults.retrieval.max_grid_points as i64)?
            .set_default("retrieval.altitude_step_km", defaults.retrieval.altitude_step_km)?
            .set_default("retrieval.cache_enabled", defaults.retrieval.cache_enabled)?
            .set_default("retrieval.cache_capacity", defaults.retrieval.cache_capacity as i64)?
            .set_default("analysis.min_valid_fraction", defaults.analysis.min_valid_fraction)?
            .set_default("analysis.sample_resolution", defaults.analysis.sample_resolution)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join(&environment)).required(false))
            .add_source(File::from(config_dir.join("local")).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_settings_can_be_loaded() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path());
        assert!(settings.is_ok());
    }

    #[test]
    fn test_defaults_match_component_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.detection, DetectionParameters::default());
        assert_eq!(settings.manifold.parameters(), ManifoldParameters::default());
        assert_eq!(settings.retrieval, RetrievalLimits::default());
        assert_eq!(settings.analysis.min_valid_fraction, 0.8);
        assert!(settings.geomagnetic.coefficients_path.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("local.toml"),
            "[manifold]\ngrid_longitude = 20\n\n[geomagnetic]\ncoefficients_path = \"igrf.json\"\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();

        assert_eq!(settings.manifold.grid_longitude, 20);
        assert_eq!(settings.manifold.grid_latitude, 50);
        assert_eq!(
            settings.geomagnetic.coefficients_path,
            Some(PathBuf::from("igrf.json"))
        );
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("local.toml"), "[manifold]\ngrid_longitude = \"many\"\n").unwrap();

        let result = Settings::load(dir.path());

        assert!(matches!(result, Err(crate::error::Error::Config(_))));
    }
}
