//! Surface mesh extraction from an interpolated flux field

use crate::detection::statistics::percentile;
use crate::domain::coordinates::GeographicRegion;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Triangle mesh with `[lon, lat, alt]` vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    /// Flat quadrilateral at mid-altitude spanning the region
    pub fn base(region: &GeographicRegion) -> Self {
        let alt = region.mid_altitude();
        Self {
            vertices: vec![
                [region.longitude_min(), region.latitude_min(), alt],
                [region.longitude_max(), region.latitude_min(), alt],
                [region.longitude_max(), region.latitude_max(), alt],
                [region.longitude_min(), region.latitude_max(), alt],
            ],
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }
    }
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Indices of the 2D convex hull in counter-clockwise order
///
/// Collinear boundary points are dropped. Fewer than three indices means the
/// points have no area.
pub fn convex_hull(points: &[[f64; 2]]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a][0]
            .total_cmp(&points[b][0])
            .then(points[a][1].total_cmp(&points[b][1]))
    });
    order.dedup_by(|a, b| points[*a] == points[*b]);

    if order.len() < 3 {
        return order;
    }

    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);

    // lower chain
    for &i in &order {
        while hull.len() >= 2
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0.0
        {
            hull.pop();
        }
        hull.push(i);
    }
    // upper chain
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0.0
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();
    hull
}

/// Build the flux surface for interpolated grid values
///
/// Grid points at or above `threshold_percentile` of the positive values
/// become vertices, lifted between the region's altitude bounds by their
/// fraction of the largest significant flux. Faces fan across the convex
/// hull of the significant points. A field with no positive values, or
/// significant points with no 2D extent, yields [`SurfaceMesh::base`].
pub fn flux_surface(
    grid: &[[f64; 3]],
    values: &[f64],
    region: &GeographicRegion,
    threshold_percentile: f64,
) -> SurfaceMesh {
    let positive: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
    let Some(threshold) = percentile(&positive, threshold_percentile) else {
        debug!("No positive flux on grid, using base surface");
        return SurfaceMesh::base(region);
    };

    let (points, flux): (Vec<[f64; 3]>, Vec<f64>) = grid
        .iter()
        .zip(values)
        .filter(|(_, v)| **v >= threshold)
        .map(|(p, v)| (*p, *v))
        .unzip();
    let peak = flux.iter().copied().fold(f64::MIN, f64::max);
    if points.is_empty() || !(peak.is_finite() && peak > 0.0) {
        return SurfaceMesh::base(region);
    }

    let projected: Vec<[f64; 2]> = points.iter().map(|p| [p[0], p[1]]).collect();
    let hull = convex_hull(&projected);
    if hull.len() < 3 {
        warn!(
            significant_points = points.len(),
            "Surface triangulation failed: significant points have no area, using base surface"
        );
        return SurfaceMesh::base(region);
    }

    let vertices = points
        .iter()
        .zip(&flux)
        .map(|(p, f)| {
            let alt = region.altitude_min() + region.altitude_span() * (f / peak);
            [p[0], p[1], alt]
        })
        .collect();
    let faces = hull
        .windows(2)
        .skip(1)
        .map(|pair| [hull[0], pair[0], pair[1]])
        .collect();

    SurfaceMesh { vertices, faces }
}
