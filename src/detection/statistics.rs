//! Summary statistics and statistical outlier selection

use crate::domain::coordinates::GeographicCoordinates;
use serde::Serialize;

/// Population summary of a set of flux values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FluxStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl FluxStatistics {
    /// `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        Some(Self {
            count,
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }

    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.std_dev.is_finite()
    }
}

/// Linearly interpolated percentile (`p` in [0, 100]) of unsorted values
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// A sample whose total flux exceeds the statistical threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Index of the originating sample
    pub index: usize,
    /// Flux divided by the threshold, always > 1
    pub score: f64,
    pub location: GeographicCoordinates,
}

/// Samples with flux strictly above `threshold`, in input order
pub fn select_outliers(
    totals: &[f64],
    locations: &[GeographicCoordinates],
    threshold: f64,
) -> Vec<Candidate> {
    totals
        .iter()
        .zip(locations)
        .enumerate()
        .filter(|(_, (flux, _))| **flux > threshold)
        .map(|(index, (flux, location))| Candidate {
            index,
            score: flux / threshold,
            location: *location,
        })
        .collect()
}
