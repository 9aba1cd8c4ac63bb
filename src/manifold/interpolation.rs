//! Scattered-data interpolation of flux onto grid points
//!
//! Distances are Euclidean in raw `(lon°, lat°, alt km)` space.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pivot ratio below which the RBF system is treated as singular
const SINGULAR_PIVOT_RATIO: f64 = 1e-12;

/// Which interpolation path produced a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    Rbf,
    NearestNeighbor,
    SingleSourceFalloff,
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rbf => "rbf",
            Self::NearestNeighbor => "nearest_neighbor",
            Self::SingleSourceFalloff => "single_source_falloff",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolationParameters {
    /// Gaussian kernel shape parameter
    pub rbf_epsilon: f64,
    /// Added to the kernel matrix diagonal
    pub rbf_smoothing: f64,
    /// Largest sample count solved with RBF before falling back
    pub max_rbf_samples: usize,
    /// Single-sample decay length as a fraction of the farthest grid distance
    pub single_point_falloff: f64,
}

impl Default for InterpolationParameters {
    fn default() -> Self {
        Self {
            rbf_epsilon: 1.0,
            rbf_smoothing: 0.1,
            max_rbf_samples: 2000,
            single_point_falloff: 0.3,
        }
    }
}

/// Reason the RBF system could not be used
#[derive(Debug, Clone, PartialEq)]
pub enum RbfFailure {
    TooManySamples(usize),
    Singular,
    NonFinite,
}

impl fmt::Display for RbfFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManySamples(n) => write!(f, "{n} samples exceed the RBF limit"),
            Self::Singular => f.write_str("interpolation matrix is singular"),
            Self::NonFinite => f.write_str("interpolation weights are not finite"),
        }
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Gaussian RBF with a constant polynomial term
///
/// Solves `[[K + λI, 1], [1ᵀ, 0]] [w; c] = [f; 0]` once, then evaluates
/// `Σ w_i exp(-(ε r_i)²) + c` at each query point.
#[derive(Debug, Clone)]
pub struct RbfInterpolator {
    centers: Vec<[f64; 3]>,
    weights: DVector<f64>,
    constant: f64,
    epsilon: f64,
}

impl RbfInterpolator {
    pub fn fit(
        centers: &[[f64; 3]],
        values: &[f64],
        parameters: &InterpolationParameters,
    ) -> Result<Self, RbfFailure> {
        let n = centers.len();
        if n > parameters.max_rbf_samples {
            return Err(RbfFailure::TooManySamples(n));
        }

        let epsilon = parameters.rbf_epsilon;
        let kernel = |r: f64| (-(epsilon * r).powi(2)).exp();

        let system = DMatrix::from_fn(n + 1, n + 1, |i, j| match (i < n, j < n) {
            (true, true) => {
                let k = kernel(distance(&centers[i], &centers[j]));
                if i == j {
                    k + parameters.rbf_smoothing
                } else {
                    k
                }
            }
            (true, false) | (false, true) => 1.0,
            (false, false) => 0.0,
        });
        let rhs = DVector::from_fn(n + 1, |i, _| if i < n { values[i] } else { 0.0 });

        let lu = system.lu();
        let pivots = lu.u().diagonal().map(f64::abs);
        let largest = pivots.max();
        if largest.is_nan() || largest <= 0.0 || pivots.min() / largest < SINGULAR_PIVOT_RATIO {
            return Err(RbfFailure::Singular);
        }

        let solution = lu.solve(&rhs).ok_or(RbfFailure::Singular)?;
        if solution.iter().any(|w| !w.is_finite()) {
            return Err(RbfFailure::NonFinite);
        }

        Ok(Self {
            centers: centers.to_vec(),
            weights: solution.rows(0, n).into_owned(),
            constant: solution[n],
            epsilon,
        })
    }

    pub fn evaluate(&self, point: &[f64; 3]) -> f64 {
        let kernel_sum: f64 = self
            .centers
            .iter()
            .zip(self.weights.iter())
            .map(|(center, w)| w * (-(self.epsilon * distance(point, center)).powi(2)).exp())
            .sum();
        kernel_sum + self.constant
    }
}

/// Value of the closest sample for each query point; ties go to the first
pub fn nearest_neighbor(centers: &[[f64; 3]], values: &[f64], grid: &[[f64; 3]]) -> Vec<f64> {
    grid.iter()
        .map(|point| {
            let mut best = (f64::INFINITY, 0.0);
            for (center, &value) in centers.iter().zip(values) {
                let d = distance(point, center);
                if d < best.0 {
                    best = (d, value);
                }
            }
            best.1
        })
        .collect()
}

/// Exponential decay `f0·exp(-d / (fraction·d_max))` from a single sample
pub fn single_source_falloff(center: &[f64; 3], value: f64, fraction: f64, grid: &[[f64; 3]]) -> Vec<f64> {
    let distances: Vec<f64> = grid.iter().map(|p| distance(p, center)).collect();
    let max_distance = distances.iter().copied().fold(0.0, f64::max);
    if max_distance <= 0.0 {
        return vec![value; grid.len()];
    }
    let scale = max_distance * fraction;
    distances.iter().map(|d| value * (-d / scale).exp()).collect()
}
