//! Geographic coordinates and reference body models.
//!
//! Positions are expressed in a body-centred Cartesian frame where +Y points
//! to the north pole, the prime meridian crosses the equator at +Z and
//! longitude 90°E lies on +X. The frame is right-handed.
//!
//! # Example
//!
//! ```ignore
//! use globetile::geo::{Globe, GeoLocation};
//!
//! let globe = Globe::WGS84;
//! let p = globe.cartesian_position(&GeoLocation::new(37.5, 127.0, 100.0));
//! let back = globe.geo_location(p);
//! ```

mod globe;

pub use globe::{Globe, WGS84_EQUATORIAL_RADIUS, WGS84_POLAR_RADIUS};

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Wraps longitude into `[-180, 180)` and clamps latitude to `[-90, 90]`.
    pub fn normalized(&self) -> LatLon {
        let mut lon = (self.longitude + 180.0) % 360.0;
        if lon < 0.0 {
            lon += 360.0;
        }
        LatLon::new(self.latitude.clamp(-90.0, 90.0), lon - 180.0)
    }
}

/// Latitude/longitude in degrees plus altitude in meters above the surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl GeoLocation {
    pub const fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

impl From<LatLon> for GeoLocation {
    fn from(value: LatLon) -> Self {
        GeoLocation::new(value.latitude, value.longitude, 0.0)
    }
}

/// Axis-aligned rectangle in latitude/longitude space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoRectangle {
    /// South-west corner
    pub bottom_left: LatLon,
    /// North-east corner
    pub top_right: LatLon,
}

impl GeoRectangle {
    pub fn new(bottom_left: LatLon, top_right: LatLon) -> Self {
        Self {
            bottom_left,
            top_right,
        }
    }

    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.bottom_left.latitude + self.top_right.latitude) * 0.5,
            (self.bottom_left.longitude + self.top_right.longitude) * 0.5,
        )
    }

    pub fn contains(&self, point: &LatLon) -> bool {
        (self.bottom_left.latitude..=self.top_right.latitude).contains(&point.latitude)
            && (self.bottom_left.longitude..=self.top_right.longitude).contains(&point.longitude)
    }
}
