//! Dipole coefficient set with linear secular variation

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base epoch of the built-in coefficients (decimal year)
pub const IGRF13_BASE_EPOCH: f64 = 2020.0;

/// Degree-1 Gauss coefficients (nT, or nT/year for secular variation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DipoleCoefficients {
    /// Axial dipole strength
    pub g10: f64,
    pub g11: f64,
    pub h11: f64,
}

impl DipoleCoefficients {
    pub fn is_finite(&self) -> bool {
        self.g10.is_finite() && self.g11.is_finite() && self.h11.is_finite()
    }
}

/// Main field at a base epoch plus its yearly rate of change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientModel {
    pub base_epoch: f64,
    pub main_field: DipoleCoefficients,
    pub secular_variation: DipoleCoefficients,
}

impl CoefficientModel {
    /// IGRF-13 dipole terms at 2020.0
    pub fn igrf13() -> Self {
        Self {
            base_epoch: IGRF13_BASE_EPOCH,
            main_field: DipoleCoefficients {
                g10: -29442.0,
                g11: -1450.7,
                h11: 4652.9,
            },
            secular_variation: DipoleCoefficients {
                g10: 7.7,
                g11: 7.4,
                h11: -25.1,
            },
        }
    }

    /// Load a coefficient set from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Coefficients extrapolated linearly to `year`
    pub fn at_year(&self, year: f64) -> DipoleCoefficients {
        let dt = year - self.base_epoch;
        DipoleCoefficients {
            g10: self.main_field.g10 + self.secular_variation.g10 * dt,
            g11: self.main_field.g11 + self.secular_variation.g11 * dt,
            h11: self.main_field.h11 + self.secular_variation.h11 * dt,
        }
    }
}

impl Default for CoefficientModel {
    fn default() -> Self {
        Self::igrf13()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn test_base_epoch_returns_main_field() {
        let model = CoefficientModel::igrf13();
        assert_eq!(model.at_year(2020.0), model.main_field);
    }

    #[test]
    fn test_secular_variation_is_linear() {
        let coefficients = CoefficientModel::igrf13().at_year(2030.0);
        assert!((coefficients.g10 - (-29442.0 + 77.0)).abs() < 1e-9);
        assert!((coefficients.h11 - (4652.9 - 251.0)).abs() < 1e-9);
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "base_epoch": 2015.0,
                "main_field": {{"g10": -29400.0, "g11": -1500.0, "h11": 4700.0}},
                "secular_variation": {{"g10": 10.0, "g11": 8.0, "h11": -20.0}}
            }}"#
        )
        .unwrap();

        let model = CoefficientModel::load(file.path()).unwrap();
        assert_eq!(model.base_epoch, 2015.0);
        assert_eq!(model.at_year(2016.0).g10, -29390.0);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CoefficientModel::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_load_reports_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"base_epoch\": \"soon\"}}").unwrap();
        let result = CoefficientModel::load(file.path());
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
