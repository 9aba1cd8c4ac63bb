//! Regular 3D sampling grid over a region

use crate::domain::coordinates::GeographicRegion;
use serde::{Deserialize, Serialize};

/// Points per axis (longitude, latitude, altitude)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridResolution {
    pub longitude: usize,
    pub latitude: usize,
    pub altitude: usize,
}

impl GridResolution {
    pub fn new(longitude: usize, latitude: usize, altitude: usize) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
        }
    }

    pub fn point_count(&self) -> usize {
        self.longitude * self.latitude * self.altitude
    }

    pub fn has_empty_axis(&self) -> bool {
        self.longitude == 0 || self.latitude == 0 || self.altitude == 0
    }
}

impl Default for GridResolution {
    fn default() -> Self {
        Self::new(50, 50, 10)
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Grid points as `[lon, lat, alt]`, longitude varying slowest and altitude
/// fastest.
pub fn regular_grid(region: &GeographicRegion, resolution: GridResolution) -> Vec<[f64; 3]> {
    let longitudes = linspace(region.longitude_min(), region.longitude_max(), resolution.longitude);
    let latitudes = linspace(region.latitude_min(), region.latitude_max(), resolution.latitude);
    let altitudes = linspace(region.altitude_min(), region.altitude_max(), resolution.altitude);

    let mut points = Vec::with_capacity(resolution.point_count());
    for &lon in &longitudes {
        for &lat in &latitudes {
            for &alt in &altitudes {
                points.push([lon, lat, alt]);
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_grid_ordering_and_size() {
        let region = GeographicRegion::new(-90.0, 0.0, -50.0, 0.0, 200.0, 1000.0).unwrap();
        let grid = regular_grid(&region, GridResolution::new(3, 2, 2));

        assert_eq!(grid.len(), 12);
        assert_eq!(grid[0], [-90.0, -50.0, 200.0]);
        assert_eq!(grid[1], [-90.0, -50.0, 1000.0]);
        assert_eq!(grid[2], [-90.0, 0.0, 200.0]);
        assert_eq!(grid[4], [-45.0, -50.0, 200.0]);
        assert_eq!(grid[11], [0.0, 0.0, 1000.0]);
    }

    #[test]
    fn test_default_resolution() {
        let resolution = GridResolution::default();
        assert_eq!(resolution.point_count(), 25_000);
        assert!(!resolution.has_empty_axis());
        assert!(GridResolution::new(10, 0, 10).has_empty_axis());
    }
}
