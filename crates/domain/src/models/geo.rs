//! Geographic primitives and the small amount of geodesy the zone engine
//! needs.
//!
//! Distances are geodesic (WGS84) and expressed in meters. Degree/meter
//! conversions use the flat-earth approximation of 111320 meters per degree
//! of latitude, with longitude shrunk by the cosine of the latitude. The
//! approximation is intentional: grid cells produced from it must line up
//! with stored zone fixtures, so it cannot be swapped for exact geodesy.

use geo::{GeodesicDistance, Point};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Meters covered by one degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A point on the globe in floating-point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Geodesic distance between two points, in meters.
pub fn geodesic_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let pa = Point::new(a.lon, a.lat);
    let pb = Point::new(b.lon, b.lat);
    pa.geodesic_distance(&pb)
}

/// Converts a meter offset to a latitude offset in degrees.
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE_LAT
}

/// Converts a meter offset to a longitude offset in degrees at the given
/// latitude.
pub fn meters_to_lon_degrees(meters: f64, latitude: f64) -> f64 {
    meters / (METERS_PER_DEGREE_LAT * latitude.to_radians().cos())
}

/// An axis-aligned geographic rectangle.
///
/// Invariant: `south_west.lat <= north_east.lat` and
/// `south_west.lon <= north_east.lon`. [`BoundingBox::from_rect`] enforces
/// this; the partitioner and radius math rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl BoundingBox {
    pub fn new(south_west: GeoPoint, north_east: GeoPoint) -> Result<Self, DomainError> {
        if south_west.lat > north_east.lat || south_west.lon > north_east.lon {
            return Err(DomainError::InvalidBoundingBox);
        }
        Ok(Self {
            south_west,
            north_east,
        })
    }

    /// Builds a bounding box from a `[swLat, swLon, neLat, neLon]` rectangle.
    pub fn from_rect(rect: &[f64]) -> Result<Self, DomainError> {
        let [sw_lat, sw_lon, ne_lat, ne_lon]: [f64; 4] = rect
            .try_into()
            .map_err(|_| DomainError::InvalidRect(rect.len()))?;
        Self::new(GeoPoint::new(sw_lat, sw_lon), GeoPoint::new(ne_lat, ne_lon))
    }

    /// Arithmetic midpoint of the corners. Not a geodesic midpoint; the
    /// radius filter depends on this exact definition.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lon + self.north_east.lon) / 2.0,
        )
    }

    /// Geodesic length of the south edge, in meters.
    pub fn width_meters(&self) -> f64 {
        geodesic_distance(
            self.south_west,
            GeoPoint::new(self.south_west.lat, self.north_east.lon),
        )
    }

    /// Geodesic length of the west edge, in meters.
    pub fn height_meters(&self) -> f64 {
        geodesic_distance(
            self.south_west,
            GeoPoint::new(self.north_east.lat, self.south_west.lon),
        )
    }

    /// Geodesic corner-to-corner distance, in meters.
    pub fn diagonal_meters(&self) -> f64 {
        geodesic_distance(self.south_west, self.north_east)
    }
}
