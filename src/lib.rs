//! SAA Manifold - flux anomaly modelling for the South Atlantic Anomaly
//!
//! Converts between geographic and geomagnetic coordinates with a dipole
//! field model, detects regions of statistically elevated particle flux and
//! interpolates the flux field into a renderable 3D manifold.

pub mod application;
pub mod config;
pub mod detection;
pub mod domain;
pub mod error;
pub mod geomagnetic;
pub mod infrastructure;
pub mod manifold;
pub mod ports;

pub use application::{AnalysisOrchestrator, AnalysisRequest, AnalysisResult};
pub use error::{Error, Result};
