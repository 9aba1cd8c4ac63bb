//! Geographic/geomagnetic coordinate transformation on a dipole field model

pub mod coefficients;
pub mod transformer;

pub use coefficients::{CoefficientModel, DipoleCoefficients};
pub use transformer::{decimal_year, normalize_longitude, DipoleTransformer};
