//! Geometry value objects: geographic and geomagnetic positions, regions and
//! spatial extents.

use crate::domain::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius used for great-circle distances (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate length of one degree of arc on the Earth's surface (km)
pub const KM_PER_DEGREE: f64 = 111.0;

fn check_longitude(value: f64) -> Result<f64, ValidationError> {
    if (-180.0..=180.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::Longitude(value))
    }
}

fn check_latitude(value: f64) -> Result<f64, ValidationError> {
    if (-90.0..=90.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::Latitude(value))
    }
}

fn check_altitude(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::Altitude(value))
    }
}

/// A point above the Earth's surface in geographic coordinates
///
/// Longitude and latitude are in degrees, altitude in kilometres above the
/// reference surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct GeographicCoordinates {
    longitude: f64,
    latitude: f64,
    altitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    longitude: f64,
    latitude: f64,
    altitude: f64,
}

impl TryFrom<RawCoordinates> for GeographicCoordinates {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(raw.longitude, raw.latitude, raw.altitude)
    }
}

impl GeographicCoordinates {
    pub fn new(longitude: f64, latitude: f64, altitude: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            longitude: check_longitude(longitude)?,
            latitude: check_latitude(latitude)?,
            altitude: check_altitude(altitude)?,
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// Great-circle distance to another point using the haversine formula (km)
    ///
    /// Altitude is ignored; both points are projected onto the reference sphere.
    pub fn distance_to(&self, other: &GeographicCoordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.longitude, self.latitude, self.altitude]
    }
}

impl fmt::Display for GeographicCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.4}, {:.4}, {:.1} km)",
            self.longitude, self.latitude, self.altitude
        )
    }
}

/// A point expressed in the geomagnetic (dipole) frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeomagneticCoordinates {
    magnetic_longitude: f64,
    magnetic_latitude: f64,
    l_shell: f64,
    magnetic_local_time: f64,
}

impl GeomagneticCoordinates {
    pub fn new(
        magnetic_longitude: f64,
        magnetic_latitude: f64,
        l_shell: f64,
        magnetic_local_time: f64,
    ) -> Result<Self, ValidationError> {
        let magnetic_longitude = check_longitude(magnetic_longitude)?;
        let magnetic_latitude = check_latitude(magnetic_latitude)?;
        if !(l_shell.is_finite() && l_shell >= 1.0) {
            return Err(ValidationError::LShell(l_shell));
        }
        if !(0.0..24.0).contains(&magnetic_local_time) {
            return Err(ValidationError::MagneticLocalTime(magnetic_local_time));
        }
        Ok(Self {
            magnetic_longitude,
            magnetic_latitude,
            l_shell,
            magnetic_local_time,
        })
    }

    pub fn magnetic_longitude(&self) -> f64 {
        self.magnetic_longitude
    }

    pub fn magnetic_latitude(&self) -> f64 {
        self.magnetic_latitude
    }

    pub fn l_shell(&self) -> f64 {
        self.l_shell
    }

    pub fn magnetic_local_time(&self) -> f64 {
        self.magnetic_local_time
    }
}

/// Axis-aligned geographic bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegion")]
pub struct GeographicRegion {
    longitude_min: f64,
    longitude_max: f64,
    latitude_min: f64,
    latitude_max: f64,
    altitude_min: f64,
    altitude_max: f64,
}

#[derive(Deserialize)]
struct RawRegion {
    longitude_min: f64,
    longitude_max: f64,
    latitude_min: f64,
    latitude_max: f64,
    altitude_min: f64,
    altitude_max: f64,
}

impl TryFrom<RawRegion> for GeographicRegion {
    type Error = ValidationError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        Self::new(
            raw.longitude_min,
            raw.longitude_max,
            raw.latitude_min,
            raw.latitude_max,
            raw.altitude_min,
            raw.altitude_max,
        )
    }
}

impl GeographicRegion {
    pub fn new(
        longitude_min: f64,
        longitude_max: f64,
        latitude_min: f64,
        latitude_max: f64,
        altitude_min: f64,
        altitude_max: f64,
    ) -> Result<Self, ValidationError> {
        check_longitude(longitude_min)?;
        check_longitude(longitude_max)?;
        check_latitude(latitude_min)?;
        check_latitude(latitude_max)?;
        check_altitude(altitude_min)?;
        check_altitude(altitude_max)?;

        if longitude_max <= longitude_min {
            return Err(ValidationError::Region(
                "longitude_max must be greater than longitude_min".to_string(),
            ));
        }
        if latitude_max <= latitude_min {
            return Err(ValidationError::Region(
                "latitude_max must be greater than latitude_min".to_string(),
            ));
        }
        if altitude_max <= altitude_min {
            return Err(ValidationError::Region(
                "altitude_max must be greater than altitude_min".to_string(),
            ));
        }

        Ok(Self {
            longitude_min,
            longitude_max,
            latitude_min,
            latitude_max,
            altitude_min,
            altitude_max,
        })
    }

    pub fn longitude_min(&self) -> f64 {
        self.longitude_min
    }

    pub fn longitude_max(&self) -> f64 {
        self.longitude_max
    }

    pub fn latitude_min(&self) -> f64 {
        self.latitude_min
    }

    pub fn latitude_max(&self) -> f64 {
        self.latitude_max
    }

    pub fn altitude_min(&self) -> f64 {
        self.altitude_min
    }

    pub fn altitude_max(&self) -> f64 {
        self.altitude_max
    }

    pub fn longitude_span(&self) -> f64 {
        self.longitude_max - self.longitude_min
    }

    pub fn latitude_span(&self) -> f64 {
        self.latitude_max - self.latitude_min
    }

    pub fn altitude_span(&self) -> f64 {
        self.altitude_max - self.altitude_min
    }

    pub fn mid_altitude(&self) -> f64 {
        (self.altitude_min + self.altitude_max) / 2.0
    }

    /// Inclusive containment test on all three axes
    pub fn contains(&self, coordinates: &GeographicCoordinates) -> bool {
        (self.longitude_min..=self.longitude_max).contains(&coordinates.longitude())
            && (self.latitude_min..=self.latitude_max).contains(&coordinates.latitude())
            && (self.altitude_min..=self.altitude_max).contains(&coordinates.altitude())
    }

    /// Approximate surface area of the box footprint (km²)
    pub fn area_km2(&self) -> f64 {
        let lat_span = self.latitude_span().to_radians();
        let lon_span = self.longitude_span().to_radians();
        let avg_lat = ((self.latitude_max + self.latitude_min) / 2.0).to_radians();

        EARTH_RADIUS_KM.powi(2) * lat_span * lon_span * avg_lat.cos()
    }
}

impl fmt::Display for GeographicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}:{},{}",
            self.longitude_min, self.latitude_min, self.longitude_max, self.latitude_max
        )
    }
}

/// Spatial extent of a phenomenon
///
/// `characteristic_length` (km) is the single scalar used for overlap, merge
/// and significance tests; the spans are in degrees (longitude, latitude) and
/// kilometres (altitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialBounds {
    longitude_span: f64,
    latitude_span: f64,
    altitude_span: f64,
    characteristic_length: f64,
}

impl SpatialBounds {
    pub fn new(
        longitude_span: f64,
        latitude_span: f64,
        altitude_span: f64,
        characteristic_length: f64,
    ) -> Result<Self, ValidationError> {
        let positive = |field: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(value)
            } else {
                Err(ValidationError::NonPositiveSpan { field, value })
            }
        };

        Ok(Self {
            longitude_span: positive("longitude_span", longitude_span)?,
            latitude_span: positive("latitude_span", latitude_span)?,
            altitude_span: positive("altitude_span", altitude_span)?,
            characteristic_length: positive("characteristic_length", characteristic_length)?,
        })
    }

    /// Extent covering a whole region; the characteristic length is half the
    /// span diagonal.
    pub fn from_region(region: &GeographicRegion) -> Self {
        let lon_span = region.longitude_span();
        let lat_span = region.latitude_span();
        Self {
            longitude_span: lon_span,
            latitude_span: lat_span,
            altitude_span: region.altitude_span(),
            characteristic_length: lon_span.hypot(lat_span) / 2.0,
        }
    }

    pub fn longitude_span(&self) -> f64 {
        self.longitude_span
    }

    pub fn latitude_span(&self) -> f64 {
        self.latitude_span
    }

    pub fn altitude_span(&self) -> f64 {
        self.altitude_span
    }

    pub fn characteristic_length(&self) -> f64 {
        self.characteristic_length
    }
}
